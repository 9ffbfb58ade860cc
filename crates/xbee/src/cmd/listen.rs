use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use xbee_frame::ApiMode;
use xbee_interface::{Event, InterfaceError, DEFAULT_REQUEST_TIMEOUT};
use xbee_schema::FrameType;

use crate::cmd::{parse_frame_type, ListenArgs};
use crate::exit::{interface_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, print_frame_error, OutputFormat};

/// How long one wait lasts before the Ctrl-C flag is checked again.
const TICK: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let filter = args
        .types
        .iter()
        .map(|name| parse_frame_type(name))
        .collect::<CliResult<Vec<FrameType>>>()?;
    let mode: ApiMode = args.connect.api_mode.into();
    let mut radio = args.connect.open(DEFAULT_REQUEST_TIMEOUT)?;
    info!(port = %args.connect.port, "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let event = match radio.next_event(Some(TICK)) {
            Ok(event) => event,
            Err(InterfaceError::Timeout(_)) => continue,
            Err(err) => return Err(interface_error("receive failed", err)),
        };

        match event {
            Event::Frame(frame) => {
                if !filter.is_empty() && !filter.contains(&frame.frame_type) {
                    continue;
                }
                print_frame(&frame, mode, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Event::Error(err) => {
                warn!(error = %err, "skipping bad frame");
                print_frame_error(&err, format);
            }
            Event::Closed { reason } => {
                info!(reason = reason.as_deref().unwrap_or("end of stream"), "radio closed");
                break;
            }
        }
    }

    if let Err(err) = radio.close() {
        warn!(error = %err, "close failed");
    }
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
