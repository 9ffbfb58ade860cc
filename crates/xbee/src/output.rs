use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xbee_frame::{
    build, checksum, hex_string, to_wire, to_wire_escaped, ApiMode, Frame, FrameError,
};
use xbee_schema::{FrameSchema, FrameType, Tail};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FieldOutput {
    name: &'static str,
    value: String,
}

#[derive(Serialize)]
struct FrameOutput {
    frame_type: &'static str,
    identifier: String,
    description: &'static str,
    length: usize,
    fields: Vec<FieldOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    route_records: Option<Vec<String>>,
    checksum: String,
    wire: String,
    timestamp: String,
}

impl FrameOutput {
    fn new(frame: &Frame, mode: ApiMode) -> xbee_frame::Result<Self> {
        let schema = frame.frame_type.schema();
        let body = build(frame)?;
        let wire = hex_string(&wire_bytes(frame, mode)?);

        let fields = schema
            .fields
            .iter()
            .map(|slot| FieldOutput {
                name: slot.field.name(),
                value: slot.field.render(frame.get(slot.field)),
            })
            .collect();

        Ok(Self {
            frame_type: frame.frame_type.name(),
            identifier: format!("0x{:02x}", frame.frame_type.id()),
            description: frame.frame_type.description(),
            length: body.len(),
            fields,
            data: schema.data_offset().map(|_| hex_string(&frame.data)),
            route_records: schema.route_records_offset().map(|_| {
                frame
                    .route_records
                    .iter()
                    .map(|addr| format!("0x{addr:04x}"))
                    .collect()
            }),
            checksum: format!("0x{:02x}", checksum(&body)),
            wire,
            timestamp: now_unix_seconds(),
        })
    }
}

/// Print one frame: a JSON line, a table, the multi-line report, or raw wire bytes.
///
/// A frame that cannot be encoded is reported like a stream error.
pub fn print_frame(frame: &Frame, mode: ApiMode, format: OutputFormat) {
    let printed = match format {
        OutputFormat::Json => FrameOutput::new(frame, mode).map(|out| {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }),
        OutputFormat::Table => FrameOutput::new(frame, mode).map(|out| print_frame_table(&out)),
        OutputFormat::Pretty => {
            println!("{frame}");
            Ok(())
        }
        OutputFormat::Raw => wire_bytes(frame, mode).map(|wire| print_raw(&wire)),
    };
    if let Err(err) = printed {
        print_frame_error(&err, format);
    }
}

fn print_frame_table(out: &FrameOutput) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            format!("{} ({})", out.description, out.identifier),
            format!("{} bytes", out.length),
        ]);
    for field in &out.fields {
        table.add_row(vec![field.name.to_string(), field.value.clone()]);
    }
    if let Some(data) = &out.data {
        table.add_row(vec!["data".to_string(), data.clone()]);
    }
    if let Some(routes) = &out.route_records {
        table.add_row(vec!["route_records".to_string(), routes.join(" ")]);
    }
    table.add_row(vec!["checksum".to_string(), out.checksum.clone()]);
    println!("{table}");
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
    recoverable: bool,
    timestamp: String,
}

/// Report a frame-scoped stream error in the same stream as frames.
pub fn print_frame_error(err: &FrameError, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ErrorOutput {
                error: err.to_string(),
                recoverable: err.is_recoverable(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("error: {err}"),
        OutputFormat::Raw => eprintln!("error: {err}"),
    }
}

#[derive(Serialize)]
struct TypeSummary {
    identifier: String,
    name: &'static str,
    description: &'static str,
    direction: &'static str,
    min_length: usize,
    field_count: usize,
}

impl TypeSummary {
    fn new(schema: &FrameSchema) -> Self {
        let frame_type = schema.frame_type;
        Self {
            identifier: format!("0x{:02x}", frame_type.id()),
            name: frame_type.name(),
            description: frame_type.description(),
            direction: direction(frame_type),
            min_length: schema.min_length(),
            field_count: schema.field_count(),
        }
    }
}

pub fn print_type_list(schemas: &[FrameSchema], format: OutputFormat) {
    let rows: Vec<TypeSummary> = schemas.iter().map(TypeSummary::new).collect();
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "NAME", "DESCRIPTION", "DIR", "MIN", "FIELDS"]);
            for row in &rows {
                table.add_row(vec![
                    row.identifier.clone(),
                    row.name.to_string(),
                    row.description.to_string(),
                    row.direction.to_string(),
                    row.min_length.to_string(),
                    row.field_count.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!("{}  {:<28} {}", row.identifier, row.name, row.description);
            }
        }
    }
}

#[derive(Serialize)]
struct SlotOutput {
    offset: u16,
    width: u16,
    name: String,
    label: &'static str,
}

#[derive(Serialize)]
struct LayoutOutput {
    #[serde(flatten)]
    summary: TypeSummary,
    layout: Vec<SlotOutput>,
}

pub fn print_layout(schema: &FrameSchema, format: OutputFormat) {
    let mut layout: Vec<SlotOutput> = schema
        .fields
        .iter()
        .map(|slot| SlotOutput {
            offset: slot.offset,
            width: slot.field.width(),
            name: slot.field.name().to_string(),
            label: slot.field.label(),
        })
        .collect();
    match schema.tail {
        Tail::None => {}
        Tail::Data { offset, label } => layout.push(SlotOutput {
            offset,
            width: 0,
            name: "data".to_string(),
            label,
        }),
        Tail::RouteRecords { offset } => layout.push(SlotOutput {
            offset,
            width: 0,
            name: "route_records".to_string(),
            label: "Address List",
        }),
    }

    let out = LayoutOutput {
        summary: TypeSummary::new(schema),
        layout,
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OFFSET", "WIDTH", "FIELD", "LABEL"]);
            for slot in &out.layout {
                let width = match slot.width {
                    0 => "*".to_string(),
                    w => w.to_string(),
                };
                table.add_row(vec![
                    slot.offset.to_string(),
                    width,
                    slot.name.clone(),
                    slot.label.to_string(),
                ]);
            }
            println!(
                "{} {} ({}), min length {}",
                out.summary.identifier,
                out.summary.name,
                out.summary.direction,
                out.summary.min_length
            );
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("{} {}", out.summary.identifier, out.summary.description);
            for slot in &out.layout {
                println!("  {:>3}  {:<20} {}", slot.offset, slot.name, slot.label);
            }
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput {
    frame_type: &'static str,
    identifier: String,
    length: usize,
    wire: String,
}

/// Print an encoded wire frame.
pub fn print_wire(frame_type: FrameType, body_len: usize, wire: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                frame_type: frame_type.name(),
                identifier: format!("0x{:02x}", frame_type.id()),
                length: body_len,
                wire: hex_string(wire),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", hex_string(wire)),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_ports(ports: &[PathBuf], format: OutputFormat) {
    let names: Vec<String> = ports.iter().map(|p| p.display().to_string()).collect();
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT"]);
            for name in &names {
                table.add_row(vec![name.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for name in &names {
                println!("{name}");
            }
        }
    }
}

/// The complete wire frame for `frame` in `mode`.
pub fn wire_bytes(frame: &Frame, mode: ApiMode) -> xbee_frame::Result<Vec<u8>> {
    let wire = match mode {
        ApiMode::Unescaped => to_wire(frame)?,
        ApiMode::Escaped => to_wire_escaped(frame)?,
    };
    Ok(wire.to_vec())
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn direction(frame_type: FrameType) -> &'static str {
    if frame_type.is_inbound() {
        "inbound"
    } else {
        "outbound"
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
