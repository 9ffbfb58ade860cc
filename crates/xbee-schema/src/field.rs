use std::fmt;

use crate::error::SchemaError;

/// Named fixed-width slots a frame body may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FrameId,
    AtCommand,
    Status,
    Options,
    Reserved,
    Dest64,
    Dest16,
    Src64,
    Src16,
    Sender64,
    Sender16,
    Parent16,
    New64,
    New16,
    SrcEndpoint,
    DestEndpoint,
    ClusterId,
    ProfileId,
    Radius,
    TransmitRetries,
    DeliveryStatus,
    DiscoveryStatus,
    Rssi,
    DigitalMask,
    AnalogMask,
    NumSamples,
}

/// How a field value is rendered in human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Zero-padded hex, two digits per byte.
    Hex,
    /// Plain decimal.
    Decimal,
    /// Printable ASCII pair.
    Ascii,
}

impl Field {
    pub const ALL: [Field; 26] = [
        Field::FrameId,
        Field::AtCommand,
        Field::Status,
        Field::Options,
        Field::Reserved,
        Field::Dest64,
        Field::Dest16,
        Field::Src64,
        Field::Src16,
        Field::Sender64,
        Field::Sender16,
        Field::Parent16,
        Field::New64,
        Field::New16,
        Field::SrcEndpoint,
        Field::DestEndpoint,
        Field::ClusterId,
        Field::ProfileId,
        Field::Radius,
        Field::TransmitRetries,
        Field::DeliveryStatus,
        Field::DiscoveryStatus,
        Field::Rssi,
        Field::DigitalMask,
        Field::AnalogMask,
        Field::NumSamples,
    ];

    /// Width on the wire, in bytes.
    pub const fn width(self) -> u16 {
        match self {
            Field::Dest64 | Field::Src64 | Field::Sender64 | Field::New64 => 8,
            Field::AtCommand
            | Field::Dest16
            | Field::Src16
            | Field::Sender16
            | Field::Parent16
            | Field::New16
            | Field::ClusterId
            | Field::ProfileId
            | Field::DigitalMask => 2,
            _ => 1,
        }
    }

    /// snake_case name used by tooling.
    pub const fn name(self) -> &'static str {
        match self {
            Field::FrameId => "frame_id",
            Field::AtCommand => "at_cmd",
            Field::Status => "status",
            Field::Options => "options",
            Field::Reserved => "reserved",
            Field::Dest64 => "dest64",
            Field::Dest16 => "dest16",
            Field::Src64 => "src64",
            Field::Src16 => "src16",
            Field::Sender64 => "sender64",
            Field::Sender16 => "sender16",
            Field::Parent16 => "parent16",
            Field::New64 => "new64",
            Field::New16 => "new16",
            Field::SrcEndpoint => "src_ep",
            Field::DestEndpoint => "dest_ep",
            Field::ClusterId => "cluster_id",
            Field::ProfileId => "profile_id",
            Field::Radius => "radius",
            Field::TransmitRetries => "transmit_retries",
            Field::DeliveryStatus => "delivery_status",
            Field::DiscoveryStatus => "discovery_status",
            Field::Rssi => "rssi",
            Field::DigitalMask => "digital_mask",
            Field::AnalogMask => "analog_mask",
            Field::NumSamples => "num_samples",
        }
    }

    /// Display label, e.g. `Frame ID`.
    pub const fn label(self) -> &'static str {
        match self {
            Field::FrameId => "Frame ID",
            Field::AtCommand => "AT Command",
            Field::Status => "Status",
            Field::Options => "Options",
            Field::Reserved => "Reserved",
            Field::Dest64 => "Dest64",
            Field::Dest16 => "Dest16",
            Field::Src64 => "Src64",
            Field::Src16 => "Src16",
            Field::Sender64 => "Sender64",
            Field::Sender16 => "Sender16",
            Field::Parent16 => "Parent16",
            Field::New64 => "New64",
            Field::New16 => "New16",
            Field::SrcEndpoint => "Source Endpoint",
            Field::DestEndpoint => "Destination Endpoint",
            Field::ClusterId => "Cluster ID",
            Field::ProfileId => "Profile ID",
            Field::Radius => "Radius",
            Field::TransmitRetries => "Transmit Retries",
            Field::DeliveryStatus => "Delivery Status",
            Field::DiscoveryStatus => "Discovery Status",
            Field::Rssi => "RSSI",
            Field::DigitalMask => "Digital Mask",
            Field::AnalogMask => "Analog Mask",
            Field::NumSamples => "Samples",
        }
    }

    pub const fn format(self) -> FieldFormat {
        match self {
            Field::AtCommand => FieldFormat::Ascii,
            Field::Radius | Field::TransmitRetries | Field::NumSamples | Field::Rssi => {
                FieldFormat::Decimal
            }
            _ => FieldFormat::Hex,
        }
    }

    /// Largest value the field can hold.
    pub const fn max_value(self) -> u64 {
        match self.width() {
            8 => u64::MAX,
            w => (1u64 << (w * 8)) - 1,
        }
    }

    /// Look up a field by its snake_case name.
    pub fn from_name(name: &str) -> Result<Self, SchemaError> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == name)
            .ok_or_else(|| SchemaError::UnknownField(name.to_string()))
    }

    /// Render `value` according to [`Field::format`].
    pub fn render(self, value: u64) -> String {
        match self.format() {
            FieldFormat::Decimal => value.to_string(),
            FieldFormat::Ascii => {
                let [hi, lo] = (value as u16).to_be_bytes();
                [hi, lo]
                    .iter()
                    .map(|&b| {
                        if b.is_ascii_graphic() || b == b' ' {
                            b as char
                        } else {
                            '.'
                        }
                    })
                    .collect()
            }
            FieldFormat::Hex => {
                let digits = usize::from(self.width()) * 2;
                format!("0x{value:0digits$x}")
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_resolvable() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Ok(field));
        }
        assert_eq!(
            Field::from_name("nope"),
            Err(SchemaError::UnknownField("nope".to_string()))
        );
    }

    #[test]
    fn max_value_matches_width() {
        assert_eq!(Field::FrameId.max_value(), 0xFF);
        assert_eq!(Field::Dest16.max_value(), 0xFFFF);
        assert_eq!(Field::Dest64.max_value(), u64::MAX);
    }

    #[test]
    fn render_formats() {
        assert_eq!(Field::Dest16.render(0x4321), "0x4321");
        assert_eq!(Field::FrameId.render(0x0a), "0x0a");
        assert_eq!(Field::Dest64.render(1), "0x0000000000000001");
        assert_eq!(Field::Radius.render(2), "2");
        assert_eq!(Field::AtCommand.render(u64::from(u16::from_be_bytes(*b"NI"))), "NI");
    }
}
