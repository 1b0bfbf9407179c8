//! Built-in converter pairs for absolute times and UUIDs.

use chrono::DateTime;
use pbrecord_core::{Record, Value};
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, Value as ProtoValue};
use uuid::Uuid;

use crate::{
    coerce::{kind_name, proto_variant},
    converter::{ConvertContext, ConverterPair},
    error::ConvertError,
    mapper::TimePolicy,
};

/// `DateTime` fields ↔ `Timestamp` messages (`seconds` + `nanos`).
///
/// Naive record values are read as UTC. Values coming back from a message
/// are aware or naive according to the mapper's [`TimePolicy`].
pub fn timestamp_pair() -> ConverterPair {
    ConverterPair::new(timestamp_to_message, timestamp_from_message)
}

/// `Uuid` fields ↔ string fields holding the hyphenated form.
pub fn uuid_pair() -> ConverterPair {
    ConverterPair::new(uuid_to_message, uuid_from_message)
}

fn timestamp_to_message(
    _cx: &ConvertContext<'_>,
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<(), ConvertError> {
    let instant = match value {
        Value::DateTime(dt) => *dt,
        Value::NaiveDateTime(naive) => naive.and_utc(),
        other => return Err(ConvertError::mismatch("DateTime", other.variant_name())),
    };
    let Kind::Message(desc) = field.kind() else {
        return Err(ConvertError::mismatch("Timestamp", kind_name(&field.kind())));
    };
    let nanos = i32::try_from(instant.timestamp_subsec_nanos()).map_err(|_| {
        ConvertError::OutOfRange {
            value: instant.timestamp_subsec_nanos().to_string(),
            target: "int32",
        }
    })?;
    let mut timestamp = DynamicMessage::new(desc);
    timestamp.try_set_field_by_name("seconds", ProtoValue::I64(instant.timestamp()))?;
    timestamp.try_set_field_by_name("nanos", ProtoValue::I32(nanos))?;
    message.try_set_field(field, ProtoValue::Message(timestamp))?;
    Ok(())
}

fn timestamp_from_message(
    cx: &ConvertContext<'_>,
    record: &mut Record,
    name: &str,
    _field: &FieldDescriptor,
    value: &ProtoValue,
) -> Result<(), ConvertError> {
    let Some(timestamp) = value.as_message() else {
        return Err(ConvertError::mismatch("Timestamp", proto_variant(value)));
    };
    let seconds = timestamp
        .get_field_by_name("seconds")
        .and_then(|v| v.as_i64())
        .unwrap_or_default();
    let nanos = timestamp
        .get_field_by_name("nanos")
        .and_then(|v| v.as_i32())
        .unwrap_or_default();
    let instant = u32::try_from(nanos)
        .ok()
        .and_then(|n| DateTime::from_timestamp(seconds, n))
        .ok_or(ConvertError::InvalidTimestamp { seconds, nanos })?;
    let converted = match cx.time_policy() {
        TimePolicy::Aware => Value::DateTime(instant),
        TimePolicy::Naive => Value::NaiveDateTime(instant.naive_utc()),
    };
    record.set(name, converted)?;
    Ok(())
}

fn uuid_to_message(
    _cx: &ConvertContext<'_>,
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<(), ConvertError> {
    let Value::Uuid(uuid) = value else {
        return Err(ConvertError::mismatch("Uuid", value.variant_name()));
    };
    if !matches!(field.kind(), Kind::String) {
        return Err(ConvertError::mismatch("string", kind_name(&field.kind())));
    }
    message.try_set_field(field, ProtoValue::String(uuid.hyphenated().to_string()))?;
    Ok(())
}

fn uuid_from_message(
    _cx: &ConvertContext<'_>,
    record: &mut Record,
    name: &str,
    _field: &FieldDescriptor,
    value: &ProtoValue,
) -> Result<(), ConvertError> {
    let Some(text) = value.as_str() else {
        return Err(ConvertError::mismatch("string", proto_variant(value)));
    };
    record.set(name, Uuid::parse_str(text)?)?;
    Ok(())
}
