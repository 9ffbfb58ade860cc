use tracing::debug;
use xbee_frame::Frame;
use xbee_interface::XBeeInterface;

use crate::cmd::encode::build_frame;
use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{interface_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let frame = build_frame(&args.frame)?;
    if args.wait && (frame.frame_type.is_inbound() || frame.correlation_id().is_none()) {
        return Err(CliError::usage(format!(
            "--wait needs a host-to-radio frame with a frame id; {} has none",
            frame.frame_type
        )));
    }

    let mut radio = args.connect.open(timeout)?;
    let response = deliver(&mut radio, frame, args.wait)
        .map_err(|err| interface_error("send failed", err))?;
    if let Some(response) = response {
        print_frame(&response, args.connect.api_mode.into(), format);
    }

    if let Err(err) = radio.close() {
        debug!(error = %err, "close after send");
    }
    Ok(SUCCESS)
}

trait Radio {
    fn send_frame(&mut self, frame: &Frame) -> xbee_interface::Result<()>;
    fn request_frame(&mut self, frame: Frame) -> xbee_interface::Result<Frame>;
}

impl Radio for XBeeInterface {
    fn send_frame(&mut self, frame: &Frame) -> xbee_interface::Result<()> {
        self.send(frame)
    }

    fn request_frame(&mut self, frame: Frame) -> xbee_interface::Result<Frame> {
        self.request(frame)
    }
}

/// Fire-and-forget, or request/response when `wait` is set.
fn deliver<R: Radio>(
    radio: &mut R,
    frame: Frame,
    wait: bool,
) -> xbee_interface::Result<Option<Frame>> {
    if wait {
        radio.request_frame(frame).map(Some)
    } else {
        radio.send_frame(&frame).map(|()| None)
    }
}
