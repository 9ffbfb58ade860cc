use std::fmt;

use bytes::Bytes;
use xbee_schema::{Field, FrameType, Tail};

use crate::field::checksum;

/// A structured API frame.
///
/// Only the fields carried by `frame_type` reach the wire; the rest stay at
/// zero after decoding and are ignored when building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: FrameType,
    pub frame_id: u8,
    pub at_cmd: [u8; 2],
    pub status: u8,
    pub options: u8,
    pub reserved: u8,
    pub dest64: u64,
    pub dest16: u16,
    pub src64: u64,
    pub src16: u16,
    pub sender64: u64,
    pub sender16: u16,
    pub parent16: u16,
    pub new64: u64,
    pub new16: u16,
    pub src_ep: u8,
    pub dest_ep: u8,
    pub cluster_id: u16,
    pub profile_id: u16,
    pub radius: u8,
    pub transmit_retries: u8,
    pub delivery_status: u8,
    pub discovery_status: u8,
    pub rssi: u8,
    pub digital_mask: u16,
    pub analog_mask: u8,
    pub num_samples: u8,
    /// Opaque tail bytes (RF data, AT parameters, samples, keys).
    pub data: Bytes,
    /// 16-bit hop addresses for source routes and route records.
    pub route_records: Vec<u16>,
}

impl Frame {
    /// An all-zero frame of the given type.
    pub fn new(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            ..Self::default()
        }
    }

    /// Local AT command request, e.g. `Frame::at_command(1, *b"NI", b"")`.
    pub fn at_command(frame_id: u8, command: [u8; 2], parameter: impl Into<Bytes>) -> Self {
        Self {
            frame_id,
            at_cmd: command,
            data: parameter.into(),
            ..Self::new(FrameType::AtCommand)
        }
    }

    /// ZigBee transmit request.
    pub fn tx_request(
        frame_id: u8,
        dest64: u64,
        dest16: u16,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            frame_id,
            dest64,
            dest16,
            data: payload.into(),
            ..Self::new(FrameType::TxRequest)
        }
    }

    /// Read a fixed field as an unsigned integer.
    ///
    /// `at_cmd` reads as its two ASCII bytes, big-endian.
    pub fn get(&self, field: Field) -> u64 {
        match field {
            Field::FrameId => u64::from(self.frame_id),
            Field::AtCommand => u64::from(u16::from_be_bytes(self.at_cmd)),
            Field::Status => u64::from(self.status),
            Field::Options => u64::from(self.options),
            Field::Reserved => u64::from(self.reserved),
            Field::Dest64 => self.dest64,
            Field::Dest16 => u64::from(self.dest16),
            Field::Src64 => self.src64,
            Field::Src16 => u64::from(self.src16),
            Field::Sender64 => self.sender64,
            Field::Sender16 => u64::from(self.sender16),
            Field::Parent16 => u64::from(self.parent16),
            Field::New64 => self.new64,
            Field::New16 => u64::from(self.new16),
            Field::SrcEndpoint => u64::from(self.src_ep),
            Field::DestEndpoint => u64::from(self.dest_ep),
            Field::ClusterId => u64::from(self.cluster_id),
            Field::ProfileId => u64::from(self.profile_id),
            Field::Radius => u64::from(self.radius),
            Field::TransmitRetries => u64::from(self.transmit_retries),
            Field::DeliveryStatus => u64::from(self.delivery_status),
            Field::DiscoveryStatus => u64::from(self.discovery_status),
            Field::Rssi => u64::from(self.rssi),
            Field::DigitalMask => u64::from(self.digital_mask),
            Field::AnalogMask => u64::from(self.analog_mask),
            Field::NumSamples => u64::from(self.num_samples),
        }
    }

    /// Set a fixed field. Values wider than the field are truncated to its width.
    pub fn set(&mut self, field: Field, value: u64) {
        let value = value & field.max_value();
        match field {
            Field::FrameId => self.frame_id = value as u8,
            Field::AtCommand => self.at_cmd = (value as u16).to_be_bytes(),
            Field::Status => self.status = value as u8,
            Field::Options => self.options = value as u8,
            Field::Reserved => self.reserved = value as u8,
            Field::Dest64 => self.dest64 = value,
            Field::Dest16 => self.dest16 = value as u16,
            Field::Src64 => self.src64 = value,
            Field::Src16 => self.src16 = value as u16,
            Field::Sender64 => self.sender64 = value,
            Field::Sender16 => self.sender16 = value as u16,
            Field::Parent16 => self.parent16 = value as u16,
            Field::New64 => self.new64 = value,
            Field::New16 => self.new16 = value as u16,
            Field::SrcEndpoint => self.src_ep = value as u8,
            Field::DestEndpoint => self.dest_ep = value as u8,
            Field::ClusterId => self.cluster_id = value as u16,
            Field::ProfileId => self.profile_id = value as u16,
            Field::Radius => self.radius = value as u8,
            Field::TransmitRetries => self.transmit_retries = value as u8,
            Field::DeliveryStatus => self.delivery_status = value as u8,
            Field::DiscoveryStatus => self.discovery_status = value as u8,
            Field::Rssi => self.rssi = value as u8,
            Field::DigitalMask => self.digital_mask = value as u16,
            Field::AnalogMask => self.analog_mask = value as u8,
            Field::NumSamples => self.num_samples = value as u8,
        }
    }

    /// The frame id, when this type carries one.
    pub fn correlation_id(&self) -> Option<u8> {
        self.frame_type
            .schema()
            .has_field(Field::FrameId)
            .then_some(self.frame_id)
    }
}

/// Space-separated lowercase hex, e.g. `7e 00 02 8a 06 6f`.
pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Multi-line report: type, length, every present field in offset order,
/// the tail, and the checksum of the built body.
///
/// A frame that cannot be built reports the build error in place of the
/// length and checksum.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = self.frame_type.schema();
        let body = crate::codec::build(self);

        writeln!(f, "XBee Frame: {}", self.frame_type.description())?;
        match &body {
            Ok(body) => writeln!(f, "  Length: {}", body.len())?,
            Err(err) => writeln!(f, "  Length: unavailable ({err})")?,
        }
        writeln!(f, "  Identifier: 0x{:02x}", self.frame_type.id())?;
        for slot in schema.fields {
            writeln!(f, "  {}: {}", slot.field.label(), slot.field.render(self.get(slot.field)))?;
        }
        match schema.tail {
            Tail::None => {}
            Tail::Data { label, .. } => {
                write!(f, "  {label} (hex):")?;
                write_rows(f, self.data.iter().map(|b| format!("{b:02x}")))?;
            }
            Tail::RouteRecords { .. } => {
                write!(f, "  Route Records (hex):")?;
                write_rows(f, self.route_records.iter().map(|r| format!("{r:04x}")))?;
            }
        }
        match &body {
            Ok(body) => write!(f, "  Checksum: 0x{:02x}", checksum(body)),
            Err(_) => write!(f, "  Checksum: unavailable"),
        }
    }
}

fn write_rows(f: &mut fmt::Formatter<'_>, items: impl Iterator<Item = String>) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 && i % 16 == 0 {
            write!(f, "\n   ")?;
        }
        write!(f, " {item}")?;
    }
    writeln!(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_is_zeroed() {
        let frame = Frame::new(FrameType::TxStatus);
        assert_eq!(frame.frame_type, FrameType::TxStatus);
        for field in Field::ALL {
            assert_eq!(frame.get(field), 0, "{field}");
        }
        assert!(frame.data.is_empty());
        assert!(frame.route_records.is_empty());
    }

    #[test]
    fn default_type_is_at_command() {
        assert_eq!(Frame::default().frame_type, FrameType::AtCommand);
    }

    #[test]
    fn set_then_get_every_field() {
        let mut frame = Frame::default();
        for (i, field) in Field::ALL.iter().copied().enumerate() {
            let value = (i as u64 + 1) & field.max_value();
            frame.set(field, value);
            assert_eq!(frame.get(field), value, "{field}");
        }
    }

    #[test]
    fn set_truncates_to_width() {
        let mut frame = Frame::default();
        frame.set(Field::Dest16, 0x1_2345);
        assert_eq!(frame.dest16, 0x2345);
        frame.set(Field::AtCommand, u64::from(u16::from_be_bytes(*b"ID")));
        assert_eq!(&frame.at_cmd, b"ID");
    }

    #[test]
    fn correlation_id_only_for_types_with_frame_id() {
        let mut status = Frame::new(FrameType::TxStatus);
        status.frame_id = 7;
        assert_eq!(status.correlation_id(), Some(7));

        let modem = Frame::new(FrameType::ModemStatus);
        assert_eq!(modem.correlation_id(), None);
    }

    #[test]
    fn hex_string_format() {
        assert_eq!(hex_string(&[0x7E, 0x00, 0x0A]), "7e 00 0a");
        assert_eq!(hex_string(&[]), "");
    }

    #[test]
    fn display_lists_fields_in_offset_order() {
        let frame = Frame {
            radius: 2,
            options: 3,
            ..Frame::tx_request(1, 0x1234_5678_1234_5678, 0x4321, vec![0x12, 0x34])
        };
        let text = frame.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "XBee Frame: Transmit Request");
        assert_eq!(lines[1], "  Length: 16");
        assert_eq!(lines[2], "  Identifier: 0x10");
        assert_eq!(lines[3], "  Frame ID: 0x01");
        assert_eq!(lines[4], "  Dest64: 0x1234567812345678");
        assert_eq!(lines[5], "  Dest16: 0x4321");
        assert_eq!(lines[6], "  Radius: 2");
        assert_eq!(lines[7], "  Options: 0x03");
        assert_eq!(lines[8], "  RF Data (hex): 12 34");
        assert!(lines[9].starts_with("  Checksum: 0x"));
    }

    #[test]
    fn display_wraps_long_data() {
        let frame = Frame::at_command(1, *b"NI", vec![0xAB; 20]);
        let text = frame.to_string();
        assert!(text.contains("  Parameter (hex): ab ab"));
        assert!(text.contains("\n    ab ab ab ab\n"));
    }

    #[test]
    fn display_route_records() {
        let frame = Frame {
            route_records: vec![0xEEFF, 0xCCDD],
            ..Frame::new(FrameType::CreateSourceRoute)
        };
        assert!(frame.to_string().contains("  Route Records (hex): eeff ccdd"));
    }

    #[test]
    fn display_reports_unbuildable_frame() {
        let frame = Frame {
            route_records: vec![0x0001; 256],
            ..Frame::new(FrameType::CreateSourceRoute)
        };
        let text = frame.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[1],
            format!(
                "  Length: unavailable ({})",
                crate::FrameError::TooManyRouteRecords { count: 256 }
            )
        );
        assert!(!text.contains("Length: 0"));
        assert_eq!(lines.last(), Some(&"  Checksum: unavailable"));
    }
}
