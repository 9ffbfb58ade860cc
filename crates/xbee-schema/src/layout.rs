use crate::field::Field;
use crate::frame_type::FrameType;

/// A fixed field placed at an absolute body offset.
///
/// Offset 0 holds the identifier, so every slot offset is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    pub field: Field,
    pub offset: u16,
}

impl FieldSlot {
    const fn new(field: Field, offset: u16) -> Self {
        Self { field, offset }
    }

    /// One past the last byte this slot occupies.
    pub const fn end(&self) -> u16 {
        self.offset + self.field.width()
    }
}

/// Variable-length region anchored after the fixed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    /// No variable region.
    None,
    /// Opaque bytes running to the end of the body.
    Data { offset: u16, label: &'static str },
    /// A count byte followed by that many big-endian 16-bit addresses.
    RouteRecords { offset: u16 },
}

/// Layout of one frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSchema {
    pub frame_type: FrameType,
    /// Fixed fields in ascending offset order.
    pub fields: &'static [FieldSlot],
    pub tail: Tail,
}

impl FrameSchema {
    /// Offset of `field`, or `None` when this type does not carry it.
    pub fn offset(&self, field: Field) -> Option<u16> {
        self.fields
            .iter()
            .find(|slot| slot.field == field)
            .map(|slot| slot.offset)
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.offset(field).is_some()
    }

    /// Offset of the raw data tail.
    pub fn data_offset(&self) -> Option<u16> {
        match self.tail {
            Tail::Data { offset, .. } => Some(offset),
            _ => None,
        }
    }

    /// Offset of the route-record count byte.
    pub fn route_records_offset(&self) -> Option<u16> {
        match self.tail {
            Tail::RouteRecords { offset } => Some(offset),
            _ => None,
        }
    }

    /// End of the fixed region, where the tail begins.
    pub fn fixed_len(&self) -> u16 {
        self.fields.iter().map(FieldSlot::end).max().unwrap_or(1)
    }

    /// Shortest body this type can decode from.
    ///
    /// A route-record list always contributes its count byte; a data tail
    /// may be empty.
    pub fn min_length(&self) -> usize {
        let fixed = usize::from(self.fixed_len());
        match self.tail {
            Tail::RouteRecords { .. } => fixed + 1,
            _ => fixed,
        }
    }

    /// Identifier plus fixed fields plus tail.
    pub fn field_count(&self) -> usize {
        let tail = usize::from(!matches!(self.tail, Tail::None));
        1 + self.fields.len() + tail
    }
}

/// Schema for `identifier`, or `None` when the identifier is unknown.
pub fn layout(identifier: u8) -> Option<&'static FrameSchema> {
    SCHEMAS.iter().find(|s| s.frame_type.id() == identifier)
}

/// The full registry, in identifier order.
pub fn frame_schemas() -> &'static [FrameSchema] {
    &SCHEMAS
}

impl FrameType {
    /// Schema for this frame type.
    pub fn schema(self) -> &'static FrameSchema {
        // `SCHEMAS` is indexed in the same order as `FrameType::ALL`.
        let index = FrameType::ALL
            .iter()
            .position(|t| *t == self)
            .unwrap_or_default();
        &SCHEMAS[index]
    }
}

use Field::*;

const fn slot(field: Field, offset: u16) -> FieldSlot {
    FieldSlot::new(field, offset)
}

const fn data(offset: u16, label: &'static str) -> Tail {
    Tail::Data { offset, label }
}

static SCHEMAS: [FrameSchema; 29] = [
    FrameSchema {
        frame_type: FrameType::TxRequest64,
        fields: &[slot(FrameId, 1), slot(Dest64, 2), slot(Options, 10)],
        tail: data(11, "RF Data"),
    },
    FrameSchema {
        frame_type: FrameType::TxRequest16,
        fields: &[slot(FrameId, 1), slot(Dest16, 2), slot(Options, 4)],
        tail: data(5, "RF Data"),
    },
    FrameSchema {
        frame_type: FrameType::AtCommand,
        fields: &[slot(FrameId, 1), slot(AtCommand, 2)],
        tail: data(4, "Parameter"),
    },
    FrameSchema {
        frame_type: FrameType::AtCommandQueue,
        fields: &[slot(FrameId, 1), slot(AtCommand, 2)],
        tail: data(4, "Parameter"),
    },
    FrameSchema {
        frame_type: FrameType::TxRequest,
        fields: &[
            slot(FrameId, 1),
            slot(Dest64, 2),
            slot(Dest16, 10),
            slot(Radius, 12),
            slot(Options, 13),
        ],
        tail: data(14, "RF Data"),
    },
    FrameSchema {
        frame_type: FrameType::ExplicitTxRequest,
        fields: &[
            slot(FrameId, 1),
            slot(Dest64, 2),
            slot(Dest16, 10),
            slot(SrcEndpoint, 12),
            slot(DestEndpoint, 13),
            slot(ClusterId, 14),
            slot(ProfileId, 16),
            slot(Radius, 18),
            slot(Options, 19),
        ],
        tail: data(20, "RF Data"),
    },
    FrameSchema {
        frame_type: FrameType::RemoteAtCommand,
        fields: &[
            slot(FrameId, 1),
            slot(Dest64, 2),
            slot(Dest16, 10),
            slot(Options, 12),
            slot(AtCommand, 13),
        ],
        tail: data(15, "Parameter"),
    },
    FrameSchema {
        frame_type: FrameType::CreateSourceRoute,
        fields: &[
            slot(FrameId, 1),
            slot(Dest64, 2),
            slot(Dest16, 10),
            slot(Options, 12),
        ],
        tail: Tail::RouteRecords { offset: 13 },
    },
    FrameSchema {
        frame_type: FrameType::RegisterJoiningDevice,
        fields: &[
            slot(FrameId, 1),
            slot(Dest64, 2),
            slot(Dest16, 10),
            slot(Options, 12),
        ],
        tail: data(13, "Key"),
    },
    FrameSchema {
        frame_type: FrameType::RxPacket64,
        fields: &[slot(Src64, 1), slot(Rssi, 9), slot(Options, 10)],
        tail: data(11, "RF Data"),
    },
    FrameSchema {
        frame_type: FrameType::RxPacket16,
        fields: &[slot(Src16, 1), slot(Rssi, 3), slot(Options, 4)],
        tail: data(5, "RF Data"),
    },
    FrameSchema {
        frame_type: FrameType::RxPacketIo64,
        fields: &[slot(Src64, 1), slot(Rssi, 9), slot(Options, 10)],
        tail: data(11, "Samples"),
    },
    FrameSchema {
        frame_type: FrameType::RxPacketIo16,
        fields: &[slot(Src16, 1), slot(Rssi, 3), slot(Options, 4)],
        tail: data(5, "Samples"),
    },
    FrameSchema {
        frame_type: FrameType::AtCommandResponse,
        fields: &[slot(FrameId, 1), slot(AtCommand, 2), slot(Status, 4)],
        tail: data(5, "Command Data"),
    },
    FrameSchema {
        frame_type: FrameType::TxStatusS1,
        fields: &[slot(FrameId, 1), slot(Status, 2)],
        tail: Tail::None,
    },
    FrameSchema {
        frame_type: FrameType::ModemStatus,
        fields: &[slot(Status, 1)],
        tail: Tail::None,
    },
    FrameSchema {
        frame_type: FrameType::TxStatus,
        fields: &[
            slot(FrameId, 1),
            slot(Dest16, 2),
            slot(TransmitRetries, 4),
            slot(DeliveryStatus, 5),
            slot(DiscoveryStatus, 6),
        ],
        tail: Tail::None,
    },
    FrameSchema {
        frame_type: FrameType::RxPacket,
        fields: &[slot(Src64, 1), slot(Src16, 9), slot(Options, 11)],
        tail: data(12, "RF Data"),
    },
    FrameSchema {
        frame_type: FrameType::ExplicitRxPacket,
        fields: &[
            slot(Src64, 1),
            slot(Src16, 9),
            slot(SrcEndpoint, 11),
            slot(DestEndpoint, 12),
            slot(ClusterId, 13),
            slot(ProfileId, 15),
            slot(Options, 17),
        ],
        tail: data(18, "RF Data"),
    },
    FrameSchema {
        frame_type: FrameType::IoDataSampleRx,
        fields: &[
            slot(Src64, 1),
            slot(Src16, 9),
            slot(Options, 11),
            slot(NumSamples, 12),
            slot(DigitalMask, 13),
            slot(AnalogMask, 15),
        ],
        tail: data(16, "Samples"),
    },
    FrameSchema {
        frame_type: FrameType::SensorRead,
        fields: &[
            slot(Src64, 1),
            slot(Src16, 9),
            slot(Options, 11),
        ],
        tail: data(12, "Sensor Data"),
    },
    FrameSchema {
        frame_type: FrameType::NodeIdentification,
        fields: &[
            slot(Sender64, 1),
            slot(Sender16, 9),
            slot(Options, 11),
            slot(Src16, 12),
            slot(Src64, 14),
        ],
        tail: data(22, "Node Data"),
    },
    FrameSchema {
        frame_type: FrameType::RemoteCommandResponse,
        fields: &[
            slot(FrameId, 1),
            slot(Src64, 2),
            slot(Src16, 10),
            slot(AtCommand, 12),
            slot(Status, 14),
        ],
        tail: data(15, "Command Data"),
    },
    FrameSchema {
        frame_type: FrameType::OtaFirmwareUpdateStatus,
        fields: &[
            slot(Src64, 1),
            slot(Dest16, 9),
            slot(Options, 11),
        ],
        tail: data(12, "Update Data"),
    },
    FrameSchema {
        frame_type: FrameType::RouteRecord,
        fields: &[slot(Src64, 1), slot(Src16, 9), slot(Options, 11)],
        tail: Tail::RouteRecords { offset: 12 },
    },
    FrameSchema {
        frame_type: FrameType::DeviceAuthenticated,
        fields: &[slot(Src64, 1), slot(Src16, 9), slot(Status, 11)],
        tail: Tail::None,
    },
    FrameSchema {
        frame_type: FrameType::ManyToOneRouteRequest,
        fields: &[
            slot(FrameId, 1),
            slot(Src64, 2),
            slot(Src16, 10),
            slot(Reserved, 12),
        ],
        tail: Tail::None,
    },
    FrameSchema {
        frame_type: FrameType::RegisterJoiningDeviceStatus,
        fields: &[slot(FrameId, 1), slot(Status, 2)],
        tail: Tail::None,
    },
    FrameSchema {
        frame_type: FrameType::JoinNotificationStatus,
        fields: &[
            slot(Parent16, 1),
            slot(New16, 3),
            slot(New64, 5),
            slot(Status, 13),
        ],
        tail: Tail::None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_frame_type_has_exactly_one_schema() {
        for t in FrameType::ALL {
            let count = SCHEMAS.iter().filter(|s| s.frame_type == t).count();
            assert_eq!(count, 1, "{t} has {count} schema rows");
            assert_eq!(t.schema().frame_type, t);
            assert_eq!(layout(t.id()).map(|s| s.frame_type), Some(t));
        }
    }

    #[test]
    fn layout_rejects_unknown_identifiers() {
        assert!(layout(0xFF).is_none());
        assert!(layout(0x02).is_none());
        assert!(layout(0x7E).is_none());
    }

    #[test]
    fn fixed_fields_are_contiguous_and_ordered() {
        for schema in frame_schemas() {
            let mut expected = 1u16;
            for slot in schema.fields {
                assert_eq!(
                    slot.offset, expected,
                    "{}: {} expected at {expected}",
                    schema.frame_type, slot.field
                );
                expected = slot.end();
            }
        }
    }

    #[test]
    fn tail_is_anchored_at_end_of_fixed_region() {
        for schema in frame_schemas() {
            match schema.tail {
                Tail::None => {}
                Tail::Data { offset, .. } | Tail::RouteRecords { offset } => {
                    assert_eq!(offset, schema.fixed_len(), "{}", schema.frame_type);
                }
            }
        }
    }

    #[test]
    fn min_length_is_identifier_plus_last_field() {
        for schema in frame_schemas() {
            let last = schema.fields.last().expect("every type has a fixed field");
            let route_count = usize::from(schema.route_records_offset().is_some());
            assert_eq!(
                schema.min_length(),
                usize::from(last.offset + last.field.width()) + route_count
            );
        }
    }

    #[test]
    fn known_lengths_and_counts() {
        let cases = [
            (FrameType::AtCommand, 4, 4),
            (FrameType::TxRequest, 14, 7),
            (FrameType::ExplicitTxRequest, 20, 11),
            (FrameType::RemoteAtCommand, 15, 7),
            (FrameType::CreateSourceRoute, 14, 6),
            (FrameType::ModemStatus, 2, 2),
            (FrameType::TxStatus, 7, 6),
            (FrameType::IoDataSampleRx, 16, 8),
            (FrameType::SensorRead, 12, 5),
            (FrameType::OtaFirmwareUpdateStatus, 12, 5),
            (FrameType::RouteRecord, 13, 5),
            (FrameType::JoinNotificationStatus, 14, 5),
        ];
        for (t, min, count) in cases {
            assert_eq!(t.schema().min_length(), min, "{t} min_length");
            assert_eq!(t.schema().field_count(), count, "{t} field_count");
        }
    }

    #[test]
    fn offset_lookup() {
        let tx = FrameType::TxRequest.schema();
        assert_eq!(tx.offset(Field::Dest64), Some(2));
        assert_eq!(tx.offset(Field::Src64), None);
        assert_eq!(tx.data_offset(), Some(14));
        assert_eq!(tx.route_records_offset(), None);

        let rr = FrameType::RouteRecord.schema();
        assert_eq!(rr.data_offset(), None);
        assert_eq!(rr.route_records_offset(), Some(12));
    }
}
