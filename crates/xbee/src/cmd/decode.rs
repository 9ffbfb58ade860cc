use std::io::Read;

use tracing::warn;
use xbee_frame::{ApiMode, Frame, FrameError, StreamAssembler};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, print_frame_error, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = read_input(&args)?;
    let mode: ApiMode = args.api_mode.into();
    let summary = decode_all(&wire, mode);

    for item in &summary.items {
        match item {
            Ok(frame) => print_frame(frame, mode, format),
            Err(err) => print_frame_error(err, format),
        }
    }
    if summary.pending > 0 {
        warn!(pending = summary.pending, "input ends inside a frame");
    }

    let errors = summary.items.iter().filter(|item| item.is_err()).count();
    if errors > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{errors} invalid frame(s) in input"),
        ));
    }
    if summary.items.is_empty() {
        return Err(CliError::new(DATA_INVALID, "no complete frame in input"));
    }
    Ok(SUCCESS)
}

struct DecodeSummary {
    items: Vec<Result<Frame, FrameError>>,
    /// Bytes of an unfinished frame left at the end.
    pending: usize,
}

fn decode_all(wire: &[u8], mode: ApiMode) -> DecodeSummary {
    let mut assembler = StreamAssembler::with_mode(mode);
    let items = assembler.feed(wire);
    DecodeSummary {
        items,
        pending: assembler.buffered(),
    }
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.file {
        return std::fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }

    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|err| io_error("failed reading stdin", err))?;
    parse_hex(&text)
}
