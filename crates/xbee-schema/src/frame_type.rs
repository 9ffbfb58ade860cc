use std::fmt;

use crate::error::SchemaError;

/// API frame identifiers understood by the codec.
///
/// Values below `0x80` travel from the host to the radio; values at or above
/// `0x80` travel from the radio to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum FrameType {
    /// Transmit request, 64-bit address (Series 1).
    TxRequest64 = 0x00,
    /// Transmit request, 16-bit address (Series 1).
    TxRequest16 = 0x01,
    /// Local AT command, applied immediately.
    #[default]
    AtCommand = 0x08,
    /// Local AT command, value queued until `AC` or another command.
    AtCommandQueue = 0x09,
    /// Transmit request (ZigBee).
    TxRequest = 0x10,
    /// Transmit request with explicit endpoints, cluster and profile.
    ExplicitTxRequest = 0x11,
    /// AT command addressed to a remote module.
    RemoteAtCommand = 0x17,
    /// Install a source route on the local module.
    CreateSourceRoute = 0x21,
    /// Register a joining device with the trust center.
    RegisterJoiningDevice = 0x24,
    /// Receive packet, 64-bit address (Series 1).
    RxPacket64 = 0x80,
    /// Receive packet, 16-bit address (Series 1).
    RxPacket16 = 0x81,
    /// I/O sample packet, 64-bit address (Series 1).
    RxPacketIo64 = 0x82,
    /// I/O sample packet, 16-bit address (Series 1).
    RxPacketIo16 = 0x83,
    /// Response to a local AT command.
    AtCommandResponse = 0x88,
    /// Transmit status (Series 1).
    TxStatusS1 = 0x89,
    /// Modem status notification.
    ModemStatus = 0x8A,
    /// Transmit status (ZigBee).
    TxStatus = 0x8B,
    /// Receive packet (ZigBee).
    RxPacket = 0x90,
    /// Receive packet with explicit endpoints, cluster and profile.
    ExplicitRxPacket = 0x91,
    /// I/O data sample (ZigBee).
    IoDataSampleRx = 0x92,
    /// 1-Wire sensor read indicator.
    SensorRead = 0x94,
    /// Node identification indicator.
    NodeIdentification = 0x95,
    /// Response to a remote AT command.
    RemoteCommandResponse = 0x97,
    /// Over-the-air firmware update status.
    OtaFirmwareUpdateStatus = 0xA0,
    /// Route record indicator.
    RouteRecord = 0xA1,
    /// Device authenticated indicator.
    DeviceAuthenticated = 0xA2,
    /// Many-to-one route request indicator.
    ManyToOneRouteRequest = 0xA3,
    /// Status of a register joining device request.
    RegisterJoiningDeviceStatus = 0xA4,
    /// Join notification status.
    JoinNotificationStatus = 0xA5,
}

impl FrameType {
    /// Every known frame type, in identifier order.
    pub const ALL: [FrameType; 29] = [
        FrameType::TxRequest64,
        FrameType::TxRequest16,
        FrameType::AtCommand,
        FrameType::AtCommandQueue,
        FrameType::TxRequest,
        FrameType::ExplicitTxRequest,
        FrameType::RemoteAtCommand,
        FrameType::CreateSourceRoute,
        FrameType::RegisterJoiningDevice,
        FrameType::RxPacket64,
        FrameType::RxPacket16,
        FrameType::RxPacketIo64,
        FrameType::RxPacketIo16,
        FrameType::AtCommandResponse,
        FrameType::TxStatusS1,
        FrameType::ModemStatus,
        FrameType::TxStatus,
        FrameType::RxPacket,
        FrameType::ExplicitRxPacket,
        FrameType::IoDataSampleRx,
        FrameType::SensorRead,
        FrameType::NodeIdentification,
        FrameType::RemoteCommandResponse,
        FrameType::OtaFirmwareUpdateStatus,
        FrameType::RouteRecord,
        FrameType::DeviceAuthenticated,
        FrameType::ManyToOneRouteRequest,
        FrameType::RegisterJoiningDeviceStatus,
        FrameType::JoinNotificationStatus,
    ];

    /// The identifier byte.
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Look up a frame type by identifier.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.id() == id)
    }

    /// Returns true if `id` names a known frame type.
    pub fn is_valid_identifier(id: u8) -> bool {
        Self::from_id(id).is_some()
    }

    /// True for frames sent by the radio to the host.
    pub const fn is_inbound(self) -> bool {
        self.id() >= 0x80
    }

    /// Short identifier-style name, e.g. `TxRequest`.
    pub const fn name(self) -> &'static str {
        match self {
            FrameType::TxRequest64 => "TxRequest64",
            FrameType::TxRequest16 => "TxRequest16",
            FrameType::AtCommand => "AtCommand",
            FrameType::AtCommandQueue => "AtCommandQueue",
            FrameType::TxRequest => "TxRequest",
            FrameType::ExplicitTxRequest => "ExplicitTxRequest",
            FrameType::RemoteAtCommand => "RemoteAtCommand",
            FrameType::CreateSourceRoute => "CreateSourceRoute",
            FrameType::RegisterJoiningDevice => "RegisterJoiningDevice",
            FrameType::RxPacket64 => "RxPacket64",
            FrameType::RxPacket16 => "RxPacket16",
            FrameType::RxPacketIo64 => "RxPacketIo64",
            FrameType::RxPacketIo16 => "RxPacketIo16",
            FrameType::AtCommandResponse => "AtCommandResponse",
            FrameType::TxStatusS1 => "TxStatusS1",
            FrameType::ModemStatus => "ModemStatus",
            FrameType::TxStatus => "TxStatus",
            FrameType::RxPacket => "RxPacket",
            FrameType::ExplicitRxPacket => "ExplicitRxPacket",
            FrameType::IoDataSampleRx => "IoDataSampleRx",
            FrameType::SensorRead => "SensorRead",
            FrameType::NodeIdentification => "NodeIdentification",
            FrameType::RemoteCommandResponse => "RemoteCommandResponse",
            FrameType::OtaFirmwareUpdateStatus => "OtaFirmwareUpdateStatus",
            FrameType::RouteRecord => "RouteRecord",
            FrameType::DeviceAuthenticated => "DeviceAuthenticated",
            FrameType::ManyToOneRouteRequest => "ManyToOneRouteRequest",
            FrameType::RegisterJoiningDeviceStatus => "RegisterJoiningDeviceStatus",
            FrameType::JoinNotificationStatus => "JoinNotificationStatus",
        }
    }

    /// Human-readable description, e.g. `Transmit Request`.
    pub const fn description(self) -> &'static str {
        match self {
            FrameType::TxRequest64 => "Transmit Request (64-bit Address)",
            FrameType::TxRequest16 => "Transmit Request (16-bit Address)",
            FrameType::AtCommand => "AT Command",
            FrameType::AtCommandQueue => "AT Command Queue Register Value",
            FrameType::TxRequest => "Transmit Request",
            FrameType::ExplicitTxRequest => "Explicit Addressing Transmit Request",
            FrameType::RemoteAtCommand => "Remote AT Command",
            FrameType::CreateSourceRoute => "Create Source Route",
            FrameType::RegisterJoiningDevice => "Register Joining Device",
            FrameType::RxPacket64 => "Receive Packet (64-bit Address)",
            FrameType::RxPacket16 => "Receive Packet (16-bit Address)",
            FrameType::RxPacketIo64 => "Receive IO Packet (64-bit Address)",
            FrameType::RxPacketIo16 => "Receive IO Packet (16-bit Address)",
            FrameType::AtCommandResponse => "AT Command Response",
            FrameType::TxStatusS1 => "Transmit Status (Series 1)",
            FrameType::ModemStatus => "Modem Status",
            FrameType::TxStatus => "Transmit Status",
            FrameType::RxPacket => "Receive Packet",
            FrameType::ExplicitRxPacket => "Explicit Addressing Receive Packet",
            FrameType::IoDataSampleRx => "IO Data Sample RX",
            FrameType::SensorRead => "Sensor Read",
            FrameType::NodeIdentification => "Node Identification",
            FrameType::RemoteCommandResponse => "Remote AT Command Response",
            FrameType::OtaFirmwareUpdateStatus => "Over-the-Air Firmware Update Status",
            FrameType::RouteRecord => "Route Record",
            FrameType::DeviceAuthenticated => "Device Authenticated",
            FrameType::ManyToOneRouteRequest => "Many To One Route Request",
            FrameType::RegisterJoiningDeviceStatus => "Register Joining Device Status",
            FrameType::JoinNotificationStatus => "Join Notification Status",
        }
    }
}

impl TryFrom<u8> for FrameType {
    type Error = SchemaError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(SchemaError::UnknownFrameType(id))
    }
}

impl From<FrameType> for u8 {
    fn from(frame_type: FrameType) -> Self {
        frame_type.id()
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FrameType {
    type Err = SchemaError;

    /// Accepts a type name (case-insensitive) or a hex identifier such as `0x10`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            let id = u8::from_str_radix(hex, 16)
                .map_err(|_| SchemaError::UnknownField(s.to_string()))?;
            return FrameType::try_from(id);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SchemaError::UnknownField(s.to_string()))
    }
}
