//! Storage kinds of record fields.

use std::fmt::{Display, Formatter, Result};

use crate::value::Value;

/// Closed set of storage kinds a [`RecordField`](crate::RecordField) can have.
///
/// Scalar kinds hold a single value. `List` and `Map` hold repeated scalars
/// and scalar maps inline. The remaining kinds are relations: `ForeignKey`
/// and `ManyToMany` are forward relations owned by the record type,
/// `Reverse` is the implicit inverse side of another type's relation, and
/// `RepeatedMessage`/`MessageMap` are emulated collections backed by an
/// [`AuxiliaryIndex`](crate::AuxiliaryIndex).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
    DateTime,
    Uuid,
    Json,
    List,
    Map,
    ForeignKey,
    ManyToMany,
    Reverse,
    RepeatedMessage,
    MessageMap,
}

impl StorageKind {
    pub fn is_relation(self) -> bool {
        matches!(
            self,
            StorageKind::ForeignKey
                | StorageKind::ManyToMany
                | StorageKind::Reverse
                | StorageKind::RepeatedMessage
                | StorageKind::MessageMap
        )
    }

    /// Relations declared by the record type itself (everything but `Reverse`).
    pub fn is_forward_relation(self) -> bool {
        self.is_relation() && self != StorageKind::Reverse
    }

    pub fn is_emulated_collection(self) -> bool {
        matches!(self, StorageKind::RepeatedMessage | StorageKind::MessageMap)
    }

    /// Kinds with no non-null starting value. Fields of these kinds are
    /// always nullable.
    pub fn is_always_nullable(self) -> bool {
        matches!(
            self,
            StorageKind::DateTime | StorageKind::Uuid | StorageKind::ForeignKey
        )
    }

    /// Value a non-nullable field of this kind starts with.
    pub fn default_value(self) -> Value {
        match self {
            StorageKind::Bool => Value::Bool(false),
            StorageKind::I32 => Value::I32(0),
            StorageKind::I64 => Value::I64(0),
            StorageKind::U32 => Value::U32(0),
            StorageKind::U64 => Value::U64(0),
            StorageKind::F32 => Value::F32(0.0),
            StorageKind::F64 => Value::F64(0.0),
            StorageKind::String => Value::string(""),
            StorageKind::Bytes => Value::bytes(b""),
            StorageKind::Json => Value::Json(serde_json::Value::Null),
            StorageKind::List => Value::List(Vec::new()),
            StorageKind::Map => Value::Map(Vec::new()),
            StorageKind::ManyToMany | StorageKind::Reverse | StorageKind::RepeatedMessage => {
                Value::RecordList(Vec::new())
            }
            StorageKind::MessageMap => Value::RecordMap(Vec::new()),
            StorageKind::DateTime | StorageKind::Uuid | StorageKind::ForeignKey => Value::Null,
        }
    }

    /// Whether `value` is a variant this kind can store. `Null` is never
    /// accepted here; nullability is a property of the field.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (StorageKind::Bool, Value::Bool(_))
                | (StorageKind::I32, Value::I32(_))
                | (StorageKind::I64, Value::I64(_))
                | (StorageKind::U32, Value::U32(_))
                | (StorageKind::U64, Value::U64(_))
                | (StorageKind::F32, Value::F32(_))
                | (StorageKind::F64, Value::F64(_))
                | (StorageKind::String, Value::String(_))
                | (StorageKind::Bytes, Value::Bytes(_))
                | (
                    StorageKind::DateTime,
                    Value::DateTime(_) | Value::NaiveDateTime(_)
                )
                | (StorageKind::Uuid, Value::Uuid(_))
                | (StorageKind::Json, Value::Json(_))
                | (StorageKind::List, Value::List(_))
                | (StorageKind::Map, Value::Map(_))
                | (StorageKind::ForeignKey, Value::Record(_))
                | (
                    StorageKind::ManyToMany
                        | StorageKind::Reverse
                        | StorageKind::RepeatedMessage,
                    Value::RecordList(_)
                )
                | (StorageKind::MessageMap, Value::RecordMap(_))
        )
    }

    pub fn type_name(self) -> &'static str {
        match self {
            StorageKind::Bool => "bool",
            StorageKind::I32 => "i32",
            StorageKind::I64 => "i64",
            StorageKind::U32 => "u32",
            StorageKind::U64 => "u64",
            StorageKind::F32 => "f32",
            StorageKind::F64 => "f64",
            StorageKind::String => "string",
            StorageKind::Bytes => "bytes",
            StorageKind::DateTime => "datetime",
            StorageKind::Uuid => "uuid",
            StorageKind::Json => "json",
            StorageKind::List => "list",
            StorageKind::Map => "map",
            StorageKind::ForeignKey => "foreign_key",
            StorageKind::ManyToMany => "many_to_many",
            StorageKind::Reverse => "reverse",
            StorageKind::RepeatedMessage => "repeated_message",
            StorageKind::MessageMap => "message_map",
        }
    }
}

impl Display for StorageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(self.type_name())
    }
}
