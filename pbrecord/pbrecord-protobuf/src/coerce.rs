//! Default conversion: raw assignment with value coercion.

use bytes::Bytes;
use pbrecord_core::{FieldAccessError, MapKey, Record, StorageKind, Value};
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey as ProtoMapKey, ReflectMessage,
    Value as ProtoValue,
};

use crate::error::ConvertError;

/// Assign `value` onto `field` of `message`, coerced to the field's kind.
pub(crate) fn assign_to_message(
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<(), ConvertError> {
    if field.is_map() {
        for (key, item) in map_items(value)? {
            let converted = scalar_to_proto(item, &map_value_kind(field)?)?;
            insert_map_entry(message, field, key, converted)?;
        }
        return Ok(());
    }
    if field.is_list() {
        if let (Kind::Message(_), Value::Map(entries)) = (field.kind(), value) {
            // repeated key/value messages without the map-entry flag
            for (key, item) in entries {
                let converted = scalar_to_proto(item, &map_value_kind(field)?)?;
                insert_map_entry(message, field, key, converted)?;
            }
            return Ok(());
        }
        let Value::List(items) = value else {
            return Err(ConvertError::mismatch("List", value.variant_name()));
        };
        let kind = field.kind();
        let converted = items
            .iter()
            .map(|item| scalar_to_proto(item, &kind))
            .collect::<Result<Vec<_>, _>>()?;
        message.try_set_field(field, ProtoValue::List(converted))?;
        return Ok(());
    }
    let converted = scalar_to_proto(value, &field.kind())?;
    message.try_set_field(field, converted)?;
    Ok(())
}

/// Assign the message `value` onto record field `name`, coerced to its
/// storage kind.
pub(crate) fn assign_to_record(
    record: &mut Record,
    name: &str,
    value: &ProtoValue,
) -> Result<(), ConvertError> {
    let kind = record
        .record_type()
        .field(name)
        .map(|field| field.kind)
        .ok_or_else(|| FieldAccessError::UnknownField {
            record_type: record.type_name().to_string(),
            field: name.to_string(),
        })?;
    let converted = proto_to_value(value, kind)?;
    record.set(name, converted)?;
    Ok(())
}

/// Convert a message value to a record value of storage kind `kind`.
pub fn proto_to_value(value: &ProtoValue, kind: StorageKind) -> Result<Value, ConvertError> {
    let converted = match (kind, value) {
        (StorageKind::Bool, ProtoValue::Bool(v)) => Value::Bool(*v),
        (StorageKind::I32, _) => Value::I32(proto_integer(value, "i32")?),
        (StorageKind::I64, _) => Value::I64(proto_integer(value, "i64")?),
        (StorageKind::U32, _) => Value::U32(proto_integer(value, "u32")?),
        (StorageKind::U64, _) => Value::U64(proto_integer(value, "u64")?),
        (StorageKind::F32, ProtoValue::F32(v)) => Value::F32(*v),
        (StorageKind::F32, ProtoValue::F64(v)) => Value::F32(narrow_float(*v, "f32")?),
        (StorageKind::F64, ProtoValue::F32(v)) => Value::F64(f64::from(*v)),
        (StorageKind::F64, ProtoValue::F64(v)) => Value::F64(*v),
        (StorageKind::String, ProtoValue::String(v)) => Value::string(v),
        (StorageKind::Bytes, ProtoValue::Bytes(v)) => Value::bytes(v),
        (StorageKind::Json, _) => Value::Json(proto_to_json(value)),
        (StorageKind::List, ProtoValue::List(items)) => Value::List(
            items
                .iter()
                .map(proto_scalar)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        (StorageKind::Map, ProtoValue::Map(_) | ProtoValue::List(_)) => Value::Map(
            map_entries(value)?
                .into_iter()
                .map(|(key, item)| Ok((key, proto_scalar(&item)?)))
                .collect::<Result<Vec<_>, ConvertError>>()?,
        ),
        _ => return Err(ConvertError::mismatch(kind.type_name(), proto_variant(value))),
    };
    Ok(converted)
}

/// Convert a record value to a message value of kind `kind`, narrowing
/// integers with range checks.
pub fn scalar_to_proto(value: &Value, kind: &Kind) -> Result<ProtoValue, ConvertError> {
    let converted = match (kind, value) {
        (Kind::Double, _) => ProtoValue::F64(float(value)?),
        (Kind::Float, _) => ProtoValue::F32(narrow_float(float(value)?, "float")?),
        (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, _) => ProtoValue::I32(integer(value, "int32")?),
        (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, _) => ProtoValue::I64(integer(value, "int64")?),
        (Kind::Uint32 | Kind::Fixed32, _) => ProtoValue::U32(integer(value, "uint32")?),
        (Kind::Uint64 | Kind::Fixed64, _) => ProtoValue::U64(integer(value, "uint64")?),
        (Kind::Enum(_), _) => ProtoValue::EnumNumber(integer(value, "enum")?),
        (Kind::Bool, Value::Bool(v)) => ProtoValue::Bool(*v),
        (Kind::String, Value::String(v)) => ProtoValue::String(v.to_string()),
        (Kind::Bytes, Value::Bytes(v)) => ProtoValue::Bytes(Bytes::copy_from_slice(v)),
        _ => return Err(ConvertError::mismatch(kind_name(kind), value.variant_name())),
    };
    Ok(converted)
}

/// Narrow to `f32`. Finite values beyond its range are rejected; precision
/// is rounded to nearest.
fn narrow_float(value: f64, target: &'static str) -> Result<f32, ConvertError> {
    if value.is_finite() && value.abs() > f64::from(f32::MAX) {
        return Err(ConvertError::OutOfRange {
            value: value.to_string(),
            target,
        });
    }
    Ok(value as f32)
}

fn integer<T: TryFrom<i128>>(value: &Value, target: &'static str) -> Result<T, ConvertError> {
    let wide = match value {
        Value::I32(v) => i128::from(*v),
        Value::I64(v) => i128::from(*v),
        Value::U32(v) => i128::from(*v),
        Value::U64(v) => i128::from(*v),
        other => return Err(ConvertError::mismatch(target, other.variant_name())),
    };
    T::try_from(wide).map_err(|_| ConvertError::OutOfRange {
        value: wide.to_string(),
        target,
    })
}

fn float(value: &Value) -> Result<f64, ConvertError> {
    match value {
        Value::F32(v) => Ok(f64::from(*v)),
        Value::F64(v) => Ok(*v),
        Value::I32(v) => Ok(f64::from(*v)),
        Value::U32(v) => Ok(f64::from(*v)),
        other => Err(ConvertError::mismatch("float", other.variant_name())),
    }
}

fn proto_integer<T: TryFrom<i128>>(value: &ProtoValue, target: &'static str) -> Result<T, ConvertError> {
    let wide = match value {
        ProtoValue::I32(v) | ProtoValue::EnumNumber(v) => i128::from(*v),
        ProtoValue::I64(v) => i128::from(*v),
        ProtoValue::U32(v) => i128::from(*v),
        ProtoValue::U64(v) => i128::from(*v),
        other => return Err(ConvertError::mismatch(target, proto_variant(other))),
    };
    T::try_from(wide).map_err(|_| ConvertError::OutOfRange {
        value: wide.to_string(),
        target,
    })
}

/// Natural record value of a scalar message value.
fn proto_scalar(value: &ProtoValue) -> Result<Value, ConvertError> {
    let converted = match value {
        ProtoValue::Bool(v) => Value::Bool(*v),
        ProtoValue::I32(v) | ProtoValue::EnumNumber(v) => Value::I32(*v),
        ProtoValue::I64(v) => Value::I64(*v),
        ProtoValue::U32(v) => Value::U32(*v),
        ProtoValue::U64(v) => Value::U64(*v),
        ProtoValue::F32(v) => Value::F32(*v),
        ProtoValue::F64(v) => Value::F64(*v),
        ProtoValue::String(v) => Value::string(v),
        ProtoValue::Bytes(v) => Value::bytes(v),
        other => return Err(ConvertError::mismatch("scalar", proto_variant(other))),
    };
    Ok(converted)
}

fn proto_to_json(value: &ProtoValue) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        ProtoValue::Bool(v) => Json::from(*v),
        ProtoValue::I32(v) | ProtoValue::EnumNumber(v) => Json::from(*v),
        ProtoValue::I64(v) => Json::from(*v),
        ProtoValue::U32(v) => Json::from(*v),
        ProtoValue::U64(v) => Json::from(*v),
        ProtoValue::F32(v) => Json::from(f64::from(*v)),
        ProtoValue::F64(v) => Json::from(*v),
        ProtoValue::String(v) => Json::from(v.as_str()),
        ProtoValue::Bytes(v) => Json::from(v.to_vec()),
        ProtoValue::List(items) => Json::Array(items.iter().map(proto_to_json).collect()),
        ProtoValue::Map(map) => Json::Object(
            map.iter()
                .map(|(key, item)| (from_proto_key(key).to_string(), proto_to_json(item)))
                .collect(),
        ),
        ProtoValue::Message(message) => Json::Object(
            message
                .fields()
                .map(|(field, item)| (field.name().to_string(), proto_to_json(item)))
                .collect(),
        ),
    }
}

fn map_items(value: &Value) -> Result<&[(MapKey, Value)], ConvertError> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(ConvertError::mismatch("Map", other.variant_name())),
    }
}

fn map_value_kind(field: &FieldDescriptor) -> Result<Kind, ConvertError> {
    entry_fields(field).map(|(_, value_field)| value_field.kind())
}

fn entry_fields(field: &FieldDescriptor) -> Result<(FieldDescriptor, FieldDescriptor), ConvertError> {
    let Kind::Message(entry) = field.kind() else {
        return Err(ConvertError::mismatch("map field", kind_name(&field.kind())));
    };
    match (entry.get_field_by_name("key"), entry.get_field_by_name("value")) {
        (Some(key), Some(value)) => Ok((key, value)),
        _ => Err(ConvertError::mismatch("map entry", entry.full_name())),
    }
}

/// Add one entry to a map-shaped field: a key assignment on native map
/// fields, an appended key/value message otherwise.
pub fn insert_map_entry(
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    key: &MapKey,
    value: ProtoValue,
) -> Result<(), ConvertError> {
    let (key_field, value_field) = entry_fields(field)?;
    check_message(&value_field.kind(), &value)?;
    if field.is_map() {
        let key = to_proto_key(key, &key_field.kind())?;
        let Some(map) = message.get_field_mut(field).as_map_mut() else {
            return Err(ConvertError::mismatch("map", kind_name(&field.kind())));
        };
        map.insert(key, value);
        return Ok(());
    }
    let Kind::Message(entry_desc) = field.kind() else {
        return Err(ConvertError::mismatch("map field", kind_name(&field.kind())));
    };
    let mut entry = DynamicMessage::new(entry_desc);
    entry.try_set_field(&key_field, scalar_to_proto(&key_value(key), &key_field.kind())?)?;
    set_field_value(&mut entry, &value_field, value)?;
    push_element(message, field, ProtoValue::Message(entry))
}

/// Set a singular field. Message values are matched to the field by type
/// name, so they may come from another descriptor pool.
pub(crate) fn set_field_value(
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    value: ProtoValue,
) -> Result<(), ConvertError> {
    if matches!((field.kind(), &value), (Kind::Message(_), ProtoValue::Message(_)))
        && !field.is_list()
        && !field.is_map()
    {
        check_message(&field.kind(), &value)?;
        *message.get_field_mut(field) = value;
        return Ok(());
    }
    message.try_set_field(field, value)?;
    Ok(())
}

/// Append one element to a repeated field.
pub fn push_element(
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    value: ProtoValue,
) -> Result<(), ConvertError> {
    check_message(&field.kind(), &value)?;
    let Some(list) = message.get_field_mut(field).as_list_mut() else {
        return Err(ConvertError::mismatch("repeated field", field.name()));
    };
    list.push(value);
    Ok(())
}

/// Entries of a map-shaped message value in key order. Accepts native maps
/// and repeated key/value messages.
pub(crate) fn map_entries(value: &ProtoValue) -> Result<Vec<(MapKey, ProtoValue)>, ConvertError> {
    let mut entries = match value {
        ProtoValue::Map(map) => map
            .iter()
            .map(|(key, item)| (from_proto_key(key), item.clone()))
            .collect::<Vec<_>>(),
        ProtoValue::List(items) => items
            .iter()
            .map(|item| {
                let Some(entry) = item.as_message() else {
                    return Err(ConvertError::mismatch("map entry", proto_variant(item)));
                };
                let key = entry
                    .get_field_by_name("key")
                    .ok_or_else(|| ConvertError::mismatch("map entry", entry.descriptor().full_name()))?;
                let entry_value = entry
                    .get_field_by_name("value")
                    .ok_or_else(|| ConvertError::mismatch("map entry", entry.descriptor().full_name()))?;
                Ok((map_key(&key)?, entry_value.into_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => return Err(ConvertError::mismatch("map", proto_variant(other))),
    };
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(entries)
}

fn check_message(expected: &Kind, value: &ProtoValue) -> Result<(), ConvertError> {
    if let (Kind::Message(expected), ProtoValue::Message(actual)) = (expected, value) {
        if actual.descriptor().full_name() != expected.full_name() {
            return Err(ConvertError::mismatch(
                expected.full_name(),
                actual.descriptor().full_name(),
            ));
        }
    }
    Ok(())
}

fn key_value(key: &MapKey) -> Value {
    match key {
        MapKey::Bool(v) => Value::Bool(*v),
        MapKey::I32(v) => Value::I32(*v),
        MapKey::I64(v) => Value::I64(*v),
        MapKey::U32(v) => Value::U32(*v),
        MapKey::U64(v) => Value::U64(*v),
        MapKey::String(v) => Value::string(v),
    }
}

fn to_proto_key(key: &MapKey, kind: &Kind) -> Result<ProtoMapKey, ConvertError> {
    let converted = match scalar_to_proto(&key_value(key), kind)? {
        ProtoValue::Bool(v) => ProtoMapKey::Bool(v),
        ProtoValue::I32(v) => ProtoMapKey::I32(v),
        ProtoValue::I64(v) => ProtoMapKey::I64(v),
        ProtoValue::U32(v) => ProtoMapKey::U32(v),
        ProtoValue::U64(v) => ProtoMapKey::U64(v),
        ProtoValue::String(v) => ProtoMapKey::String(v),
        other => return Err(ConvertError::mismatch("map key", proto_variant(&other))),
    };
    Ok(converted)
}

fn from_proto_key(key: &ProtoMapKey) -> MapKey {
    match key {
        ProtoMapKey::Bool(v) => MapKey::Bool(*v),
        ProtoMapKey::I32(v) => MapKey::I32(*v),
        ProtoMapKey::I64(v) => MapKey::I64(*v),
        ProtoMapKey::U32(v) => MapKey::U32(*v),
        ProtoMapKey::U64(v) => MapKey::U64(*v),
        ProtoMapKey::String(v) => MapKey::String(v.clone()),
    }
}

fn map_key(value: &ProtoValue) -> Result<MapKey, ConvertError> {
    let key = match value {
        ProtoValue::Bool(v) => MapKey::Bool(*v),
        ProtoValue::I32(v) => MapKey::I32(*v),
        ProtoValue::I64(v) => MapKey::I64(*v),
        ProtoValue::U32(v) => MapKey::U32(*v),
        ProtoValue::U64(v) => MapKey::U64(*v),
        ProtoValue::String(v) => MapKey::String(v.clone()),
        other => return Err(ConvertError::mismatch("map key", proto_variant(other))),
    };
    Ok(key)
}

pub(crate) fn proto_variant(value: &ProtoValue) -> &'static str {
    match value {
        ProtoValue::Bool(_) => "bool",
        ProtoValue::I32(_) => "int32",
        ProtoValue::I64(_) => "int64",
        ProtoValue::U32(_) => "uint32",
        ProtoValue::U64(_) => "uint64",
        ProtoValue::F32(_) => "float",
        ProtoValue::F64(_) => "double",
        ProtoValue::String(_) => "string",
        ProtoValue::Bytes(_) => "bytes",
        ProtoValue::EnumNumber(_) => "enum",
        ProtoValue::Message(_) => "message",
        ProtoValue::List(_) => "list",
        ProtoValue::Map(_) => "map",
    }
}

pub(crate) fn kind_name(kind: &Kind) -> String {
    match kind {
        Kind::Double => "double".to_string(),
        Kind::Float => "float".to_string(),
        Kind::Int32 => "int32".to_string(),
        Kind::Int64 => "int64".to_string(),
        Kind::Uint32 => "uint32".to_string(),
        Kind::Uint64 => "uint64".to_string(),
        Kind::Sint32 => "sint32".to_string(),
        Kind::Sint64 => "sint64".to_string(),
        Kind::Fixed32 => "fixed32".to_string(),
        Kind::Fixed64 => "fixed64".to_string(),
        Kind::Sfixed32 => "sfixed32".to_string(),
        Kind::Sfixed64 => "sfixed64".to_string(),
        Kind::Bool => "bool".to_string(),
        Kind::String => "string".to_string(),
        Kind::Bytes => "bytes".to_string(),
        Kind::Message(md) => md.full_name().to_string(),
        Kind::Enum(ed) => ed.full_name().to_string(),
    }
}
