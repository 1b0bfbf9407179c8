//! Schema introspection: classify protobuf fields by shape.

use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};

/// Scalar subtype of a [`FieldClass::Scalar`] field.
///
/// Protobuf wire variants collapse onto their value type: `sint32` and
/// `sfixed32` are `I32`, `fixed64` is `U64`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    F32,
    F64,
    I32,
    I64,
    U32,
    U64,
    Bool,
    String,
    Bytes,
    Enum,
}

/// Shape of a message field as seen by the materializer and mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldClass {
    Scalar(ScalarKind),
    Timestamp,
    RepeatedScalar,
    ScalarMap,
    Message,
    RepeatedMessage,
    MessageMap,
}

/// Name of the well-known absolute-time message.
pub const TIMESTAMP_MESSAGE: &str = "Timestamp";

/// Classify a field descriptor.
///
/// Map shape is structural: any message value with exactly the two fields
/// `key` and `value` counts, whether or not it is a generated map entry.
pub fn classify(fd: &FieldDescriptor) -> FieldClass {
    match (fd.kind(), fd.is_list()) {
        (Kind::Message(md), repeated) => classify_message(&md, repeated),
        (_, true) => FieldClass::RepeatedScalar,
        (kind, false) => scalar_kind(&kind).map_or(FieldClass::Message, FieldClass::Scalar),
    }
}

fn classify_message(md: &MessageDescriptor, repeated: bool) -> FieldClass {
    if let Some(value_field) = map_value_field(md) {
        if matches!(value_field.kind(), Kind::Message(_)) {
            FieldClass::MessageMap
        } else {
            FieldClass::ScalarMap
        }
    } else if repeated {
        FieldClass::RepeatedMessage
    } else if md.name() == TIMESTAMP_MESSAGE {
        FieldClass::Timestamp
    } else {
        FieldClass::Message
    }
}

/// Scalar subtype of a non-message kind.
pub fn scalar_kind(kind: &Kind) -> Option<ScalarKind> {
    let scalar = match kind {
        Kind::Double => ScalarKind::F64,
        Kind::Float => ScalarKind::F32,
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => ScalarKind::I32,
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => ScalarKind::I64,
        Kind::Uint32 | Kind::Fixed32 => ScalarKind::U32,
        Kind::Uint64 | Kind::Fixed64 => ScalarKind::U64,
        Kind::Bool => ScalarKind::Bool,
        Kind::String => ScalarKind::String,
        Kind::Bytes => ScalarKind::Bytes,
        Kind::Enum(_) => ScalarKind::Enum,
        Kind::Message(_) => return None,
    };
    Some(scalar)
}

/// The `value` field of a map-shaped message, if `md` is map-shaped.
pub(crate) fn map_value_field(md: &MessageDescriptor) -> Option<FieldDescriptor> {
    if md.fields().count() != 2 {
        return None;
    }
    md.get_field_by_name("key")?;
    md.get_field_by_name("value")
}

/// Message descriptor of the related record for a relation-shaped field:
/// the field's own message, or the map value's message for message maps.
pub(crate) fn related_message(fd: &FieldDescriptor) -> Option<MessageDescriptor> {
    let Kind::Message(md) = fd.kind() else {
        return None;
    };
    match map_value_field(&md) {
        Some(value_field) => match value_field.kind() {
            Kind::Message(value_md) => Some(value_md),
            _ => None,
        },
        None => Some(md),
    }
}
