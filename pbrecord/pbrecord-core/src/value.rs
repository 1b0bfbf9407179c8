//! Values held by record fields.

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeSeq};
use uuid::Uuid;

use crate::{error::ValueTypeError, record::Record};

/// Key of a scalar map or message map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(String),
}

impl Display for MapKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(v) => write!(f, "{v}"),
            MapKey::I32(v) => write!(f, "{v}"),
            MapKey::I64(v) => write!(f, "{v}"),
            MapKey::U32(v) => write!(f, "{v}"),
            MapKey::U64(v) => write!(f, "{v}"),
            MapKey::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        MapKey::String(value.to_string())
    }
}

impl From<String> for MapKey {
    fn from(value: String) -> Self {
        MapKey::String(value)
    }
}

/// Value stored in a record field.
///
/// Relation-shaped variants own the related records: `Record` for a single
/// reference, `RecordList` for many-to-many, reverse and repeated-message
/// collections, `RecordMap` for message maps.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    /// Timezone-aware absolute time.
    DateTime(DateTime<Utc>),
    /// Timezone-naive time, read as UTC wall-clock when converted.
    NaiveDateTime(NaiveDateTime),
    Uuid(Uuid),
    Json(serde_json::Value),
    List(Vec<Value>),
    Map(Vec<(MapKey, Value)>),
    Record(Box<Record>),
    RecordList(Vec<Record>),
    RecordMap(Vec<(MapKey, Record)>),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Self::String(Arc::from(s.as_ref()))
    }

    pub fn bytes(b: impl AsRef<[u8]>) -> Self {
        Self::Bytes(Arc::from(b.as_ref()))
    }

    pub fn record(record: Record) -> Self {
        Self::Record(Box::new(record))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn try_bool(&self) -> Result<Option<bool>, ValueTypeError> {
        match self {
            Value::Bool(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("Bool")),
        }
    }

    pub fn try_i32(&self) -> Result<Option<i32>, ValueTypeError> {
        match self {
            Value::I32(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("I32")),
        }
    }

    pub fn try_i64(&self) -> Result<Option<i64>, ValueTypeError> {
        match self {
            Value::I64(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("I64")),
        }
    }

    pub fn try_u32(&self) -> Result<Option<u32>, ValueTypeError> {
        match self {
            Value::U32(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("U32")),
        }
    }

    pub fn try_u64(&self) -> Result<Option<u64>, ValueTypeError> {
        match self {
            Value::U64(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("U64")),
        }
    }

    pub fn try_f32(&self) -> Result<Option<f32>, ValueTypeError> {
        match self {
            Value::F32(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("F32")),
        }
    }

    pub fn try_f64(&self) -> Result<Option<f64>, ValueTypeError> {
        match self {
            Value::F64(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("F64")),
        }
    }

    pub fn try_str(&self) -> Result<Option<&str>, ValueTypeError> {
        match self {
            Value::String(v) => Ok(Some(v.as_ref())),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("String")),
        }
    }

    pub fn try_bytes(&self) -> Result<Option<&[u8]>, ValueTypeError> {
        match self {
            Value::Bytes(v) => Ok(Some(v.as_ref())),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("Bytes")),
        }
    }

    pub fn try_uuid(&self) -> Result<Option<Uuid>, ValueTypeError> {
        match self {
            Value::Uuid(v) => Ok(Some(*v)),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("Uuid")),
        }
    }

    pub fn try_record(&self) -> Result<Option<&Record>, ValueTypeError> {
        match self {
            Value::Record(v) => Ok(Some(v)),
            Value::Null => Ok(None),
            _ => Err(self.type_mismatch("Record")),
        }
    }

    /// Members of a many-to-many, reverse or repeated-message collection.
    pub fn try_records(&self) -> Result<&[Record], ValueTypeError> {
        match self {
            Value::RecordList(v) => Ok(v),
            Value::Null => Ok(&[]),
            _ => Err(self.type_mismatch("RecordList")),
        }
    }

    pub fn try_record_map(&self) -> Result<&[(MapKey, Record)], ValueTypeError> {
        match self {
            Value::RecordMap(v) => Ok(v),
            Value::Null => Ok(&[]),
            _ => Err(self.type_mismatch("RecordMap")),
        }
    }

    pub fn type_mismatch(&self, expected: impl Into<String>) -> ValueTypeError {
        ValueTypeError::new(expected, self.variant_name())
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::I32(_) => "I32",
            Value::I64(_) => "I64",
            Value::U32(_) => "U32",
            Value::U64(_) => "U64",
            Value::F32(_) => "F32",
            Value::F64(_) => "F64",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::DateTime(_) => "DateTime",
            Value::NaiveDateTime(_) => "NaiveDateTime",
            Value::Uuid(_) => "Uuid",
            Value::Json(_) => "Json",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Record(_) => "Record",
            Value::RecordList(_) => "RecordList",
            Value::RecordMap(_) => "RecordMap",
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    DateTime<Utc> => DateTime,
    NaiveDateTime => NaiveDateTime,
    Uuid => Uuid,
    serde_json::Value => Json,
    Vec<Record> => RecordList,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(Arc::from(value))
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::record(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Bytes(v) => serializer.serialize_bytes(v),
            Value::DateTime(v) => {
                serializer.serialize_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::NaiveDateTime(v) => {
                serializer.serialize_str(&v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            Value::Uuid(v) => serializer.serialize_str(&v.hyphenated().to_string()),
            Value::Json(v) => v.serialize(serializer),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                serializer.collect_map(entries.iter().map(|(k, v)| (k.to_string(), v)))
            }
            Value::Record(record) => record.serialize(serializer),
            Value::RecordList(records) => serializer.collect_seq(records),
            Value::RecordMap(entries) => {
                serializer.collect_map(entries.iter().map(|(k, v)| (k.to_string(), v)))
            }
        }
    }
}
