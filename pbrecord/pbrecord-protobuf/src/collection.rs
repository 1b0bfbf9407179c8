//! Element-wise converters for emulated repeated-message and message-map
//! fields.

use std::sync::LazyLock;

use pbrecord_core::{Record, StorageKind, Value};
use prost_reflect::{DynamicMessage, FieldDescriptor, Value as ProtoValue};

use crate::{
    coerce::{insert_map_entry, map_entries, proto_variant, push_element},
    converter::{ConvertContext, ConverterPair},
    error::ConvertError,
};

static REPEATED_MESSAGE: LazyLock<ConverterPair> =
    LazyLock::new(|| ConverterPair::new(repeated_to_message, repeated_from_message));

static MESSAGE_MAP: LazyLock<ConverterPair> =
    LazyLock::new(|| ConverterPair::new(map_to_message, map_from_message));

/// The pair an emulated collection kind carries for itself.
pub fn collection_pair(kind: StorageKind) -> Option<ConverterPair> {
    match kind {
        StorageKind::RepeatedMessage => Some(REPEATED_MESSAGE.clone()),
        StorageKind::MessageMap => Some(MESSAGE_MAP.clone()),
        _ => None,
    }
}

fn repeated_to_message(
    cx: &ConvertContext<'_>,
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<(), ConvertError> {
    for element in value.try_records()? {
        let converted = cx.to_message(element)?;
        push_element(message, field, ProtoValue::Message(converted))?;
    }
    Ok(())
}

fn repeated_from_message(
    cx: &ConvertContext<'_>,
    record: &mut Record,
    name: &str,
    _field: &FieldDescriptor,
    value: &ProtoValue,
) -> Result<(), ConvertError> {
    let Some(items) = value.as_list() else {
        return Err(ConvertError::mismatch("list", proto_variant(value)));
    };
    let related = related_type(record, name)?;
    let elements = items
        .iter()
        .map(|item| match item.as_message() {
            Some(element) => Ok(cx.from_message(&related, element)?),
            None => Err(ConvertError::mismatch("message", proto_variant(item))),
        })
        .collect::<Result<Vec<_>, ConvertError>>()?;
    record.set(name, Value::RecordList(elements))?;
    Ok(())
}

fn map_to_message(
    cx: &ConvertContext<'_>,
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<(), ConvertError> {
    for (key, element) in value.try_record_map()? {
        let converted = cx.to_message(element)?;
        insert_map_entry(message, field, key, ProtoValue::Message(converted))?;
    }
    Ok(())
}

fn map_from_message(
    cx: &ConvertContext<'_>,
    record: &mut Record,
    name: &str,
    _field: &FieldDescriptor,
    value: &ProtoValue,
) -> Result<(), ConvertError> {
    let related = related_type(record, name)?;
    let elements = map_entries(value)?
        .into_iter()
        .map(|(key, item)| match item.as_message() {
            Some(element) => Ok((key, cx.from_message(&related, element)?)),
            None => Err(ConvertError::mismatch("message", proto_variant(&item))),
        })
        .collect::<Result<Vec<_>, ConvertError>>()?;
    record.set(name, Value::RecordMap(elements))?;
    Ok(())
}

fn related_type(record: &Record, name: &str) -> Result<String, ConvertError> {
    record
        .record_type()
        .field(name)
        .and_then(|field| field.related.clone())
        .ok_or_else(|| {
            ConvertError::custom(format!(
                "field '{name}' of '{}' has no related record type",
                record.type_name()
            ))
        })
}
