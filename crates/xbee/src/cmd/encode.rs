use xbee_frame::{build, Frame};
use xbee_schema::Field;

use crate::cmd::{parse_frame_type, parse_hex, parse_number, EncodeArgs, FrameArgs};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_wire, wire_bytes, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = build_frame(&args.frame)?;
    let body = build(&frame).map_err(|err| frame_error("encode failed", err))?;
    let wire =
        wire_bytes(&frame, args.api_mode.into()).map_err(|err| frame_error("encode failed", err))?;

    print_wire(frame.frame_type, body.len(), &wire, format);
    Ok(SUCCESS)
}

/// Turn `--type`, `--field`, `--data` and `--route` into a frame.
///
/// Unset fields stay zero. Fields and tails the type does not carry are
/// rejected rather than silently dropped.
pub fn build_frame(args: &FrameArgs) -> CliResult<Frame> {
    let frame_type = parse_frame_type(&args.frame_type)?;
    let schema = frame_type.schema();
    let mut frame = Frame::new(frame_type);

    for assignment in &args.fields {
        let (name, raw) = assignment
            .split_once('=')
            .ok_or_else(|| CliError::usage(format!("expected NAME=VALUE, got {assignment:?}")))?;
        let field = Field::from_name(name.trim()).map_err(|err| CliError::usage(err.to_string()))?;
        if !schema.has_field(field) {
            return Err(CliError::usage(format!(
                "{frame_type} has no {field} field"
            )));
        }
        frame.set(field, parse_field_value(field, raw)?);
    }

    let payload = match (&args.data, &args.data_hex) {
        (Some(text), _) => Some(text.as_bytes().to_vec()),
        (None, Some(hex)) => Some(parse_hex(hex)?),
        (None, None) => None,
    };
    if let Some(payload) = payload {
        if schema.data_offset().is_none() {
            return Err(CliError::usage(format!("{frame_type} carries no data")));
        }
        frame.data = payload.into();
    }

    if !args.route.is_empty() {
        if schema.route_records_offset().is_none() {
            return Err(CliError::usage(format!(
                "{frame_type} carries no route records"
            )));
        }
        frame.route_records = args
            .route
            .iter()
            .map(|addr| {
                let value = parse_number(addr)?;
                u16::try_from(value)
                    .map_err(|_| CliError::usage(format!("route address out of range: {addr}")))
            })
            .collect::<CliResult<Vec<u16>>>()?;
    }

    Ok(frame)
}

fn parse_field_value(field: Field, raw: &str) -> CliResult<u64> {
    let raw = raw.trim();
    if field == Field::AtCommand && raw.len() == 2 && raw.bytes().all(|b| b.is_ascii_graphic()) {
        let bytes = raw.as_bytes();
        return Ok(u64::from(u16::from_be_bytes([bytes[0], bytes[1]])));
    }

    let value = parse_number(raw)?;
    if value > field.max_value() {
        return Err(CliError::usage(format!(
            "value {raw} does not fit {field} ({} bytes)",
            field.width()
        )));
    }
    Ok(value)
}
