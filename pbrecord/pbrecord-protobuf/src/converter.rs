//! Converter registry: per-kind and per-field conversion function pairs.

use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

use pbrecord_core::{Record, StorageKind, Value};
use prost_reflect::{DynamicMessage, FieldDescriptor, Value as ProtoValue};

use crate::{
    builtin,
    coerce,
    error::{ConvertError, MappingError},
    mapper::{Mapper, TimePolicy},
};

/// State available to a converter while it runs.
#[derive(Clone, Copy)]
pub struct ConvertContext<'a> {
    mapper: &'a Mapper,
    depth: Option<i32>,
}

impl<'a> ConvertContext<'a> {
    pub(crate) fn new(mapper: &'a Mapper, depth: Option<i32>) -> Self {
        Self { mapper, depth }
    }

    pub fn mapper(&self) -> &'a Mapper {
        self.mapper
    }

    /// Remaining relation depth of the current `to_message` call; `None`
    /// means unlimited.
    pub fn depth(&self) -> Option<i32> {
        self.depth
    }

    pub fn time_policy(&self) -> TimePolicy {
        self.mapper.options().time_policy
    }

    /// Context one relation hop further down.
    pub(crate) fn descend(&self) -> Self {
        Self {
            mapper: self.mapper,
            depth: self.depth.map(|d| d - 1),
        }
    }

    /// Convert a related or element record at this context's depth.
    pub fn to_message(&self, record: &Record) -> Result<DynamicMessage, MappingError> {
        self.mapper.to_message_with_depth(record, self.depth)
    }

    /// Build a record of type `record_type` from `message`.
    pub fn from_message(
        &self,
        record_type: &str,
        message: &DynamicMessage,
    ) -> Result<Record, MappingError> {
        self.mapper.from_message(record_type, message)
    }
}

/// Record → message half of a converter: assigns `value` into `message`'s
/// field `field`.
pub type ToMessageFn = Arc<
    dyn Fn(&ConvertContext<'_>, &mut DynamicMessage, &FieldDescriptor, &Value) -> Result<(), ConvertError>
        + Send
        + Sync,
>;

/// Message → record half of a converter: assigns the message `value` of
/// schema field `field` into the record field named by the `&str`.
pub type FromMessageFn = Arc<
    dyn Fn(
            &ConvertContext<'_>,
            &mut Record,
            &str,
            &FieldDescriptor,
            &ProtoValue,
        ) -> Result<(), ConvertError>
        + Send
        + Sync,
>;

/// One direction of a converter, as registered.
#[derive(Clone)]
pub enum ConverterPart {
    ToMessage(ToMessageFn),
    FromMessage(FromMessageFn),
}

impl ConverterPart {
    pub fn to_message<F>(f: F) -> Self
    where
        F: Fn(&ConvertContext<'_>, &mut DynamicMessage, &FieldDescriptor, &Value) -> Result<(), ConvertError>
            + Send
            + Sync
            + 'static,
    {
        ConverterPart::ToMessage(Arc::new(f))
    }

    pub fn from_message<F>(f: F) -> Self
    where
        F: Fn(&ConvertContext<'_>, &mut Record, &str, &FieldDescriptor, &ProtoValue) -> Result<(), ConvertError>
            + Send
            + Sync
            + 'static,
    {
        ConverterPart::FromMessage(Arc::new(f))
    }
}

impl Debug for ConverterPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConverterPart::ToMessage(_) => f.write_str("ToMessage(..)"),
            ConverterPart::FromMessage(_) => f.write_str("FromMessage(..)"),
        }
    }
}

/// Matched (to-message, from-message) pair.
#[derive(Clone)]
pub struct ConverterPair {
    to_message: ToMessageFn,
    from_message: FromMessageFn,
}

impl ConverterPair {
    pub fn new<T, F>(to_message: T, from_message: F) -> Self
    where
        T: Fn(&ConvertContext<'_>, &mut DynamicMessage, &FieldDescriptor, &Value) -> Result<(), ConvertError>
            + Send
            + Sync
            + 'static,
        F: Fn(&ConvertContext<'_>, &mut Record, &str, &FieldDescriptor, &ProtoValue) -> Result<(), ConvertError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            to_message: Arc::new(to_message),
            from_message: Arc::new(from_message),
        }
    }

    /// Pair up registered parts. Only exactly one part of each direction
    /// forms a pair.
    pub fn from_parts(parts: &[ConverterPart]) -> Option<Self> {
        match parts {
            [ConverterPart::ToMessage(to), ConverterPart::FromMessage(from)]
            | [ConverterPart::FromMessage(from), ConverterPart::ToMessage(to)] => Some(Self {
                to_message: to.clone(),
                from_message: from.clone(),
            }),
            _ => None,
        }
    }

    pub fn into_parts(self) -> Vec<ConverterPart> {
        vec![
            ConverterPart::ToMessage(self.to_message),
            ConverterPart::FromMessage(self.from_message),
        ]
    }

    pub fn to_message(
        &self,
        cx: &ConvertContext<'_>,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<(), ConvertError> {
        (self.to_message)(cx, message, field, value)
    }

    pub fn from_message(
        &self,
        cx: &ConvertContext<'_>,
        record: &mut Record,
        record_field: &str,
        field: &FieldDescriptor,
        value: &ProtoValue,
    ) -> Result<(), ConvertError> {
        (self.from_message)(cx, record, record_field, field, value)
    }
}

impl Debug for ConverterPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("ConverterPair(..)")
    }
}

/// Result of looking up one registry table.
#[derive(Debug)]
pub(crate) enum Lookup {
    Missing,
    Found(ConverterPair),
    Malformed(usize),
}

/// Converter pairs keyed by storage kind and by schema field name.
///
/// Entries are kept as registered and only validated on lookup, so a
/// malformed registration degrades to the default conversion with a
/// warning instead of failing model definition.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    by_kind: HashMap<StorageKind, Vec<ConverterPart>>,
    by_field: HashMap<String, Vec<ConverterPart>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the absolute-time and UUID pairs.
    pub fn with_builtins() -> Self {
        Self::new()
            .with_kind(StorageKind::DateTime, builtin::timestamp_pair())
            .with_kind(StorageKind::Uuid, builtin::uuid_pair())
    }

    pub fn with_kind(mut self, kind: StorageKind, pair: ConverterPair) -> Self {
        self.register_kind(kind, pair);
        self
    }

    pub fn with_field(mut self, schema_field: impl Into<String>, pair: ConverterPair) -> Self {
        self.register_field(schema_field, pair);
        self
    }

    pub fn register_kind(&mut self, kind: StorageKind, pair: ConverterPair) {
        self.register_kind_parts(kind, pair.into_parts());
    }

    pub fn register_kind_parts(&mut self, kind: StorageKind, parts: Vec<ConverterPart>) {
        self.by_kind.insert(kind, parts);
    }

    pub fn register_field(&mut self, schema_field: impl Into<String>, pair: ConverterPair) {
        self.register_field_parts(schema_field, pair.into_parts());
    }

    pub fn register_field_parts(&mut self, schema_field: impl Into<String>, parts: Vec<ConverterPart>) {
        self.by_field.insert(schema_field.into(), parts);
    }

    /// `self` with the entries of `overrides` replacing same-keyed ones.
    pub fn merged(&self, overrides: &ConverterRegistry) -> ConverterRegistry {
        let mut merged = self.clone();
        merged
            .by_kind
            .extend(overrides.by_kind.iter().map(|(k, v)| (*k, v.clone())));
        merged
            .by_field
            .extend(overrides.by_field.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub(crate) fn kind_entry(&self, kind: StorageKind) -> Lookup {
        lookup(self.by_kind.get(&kind))
    }

    pub(crate) fn field_entry(&self, schema_field: &str) -> Lookup {
        lookup(self.by_field.get(schema_field))
    }
}

fn lookup(parts: Option<&Vec<ConverterPart>>) -> Lookup {
    match parts {
        None => Lookup::Missing,
        Some(parts) => ConverterPair::from_parts(parts)
            .map_or(Lookup::Malformed(parts.len()), Lookup::Found),
    }
}

impl Debug for ConverterRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("kinds", &self.by_kind.keys().collect::<Vec<_>>())
            .field("fields", &self.by_field.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Converter selected for one field.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// A registered pair (or an emulated collection's own pair).
    Custom(ConverterPair),
    /// Raw assignment with type coercion.
    Default,
}

impl Resolved {
    pub fn is_custom(&self) -> bool {
        matches!(self, Resolved::Custom(_))
    }

    pub fn to_message(
        &self,
        cx: &ConvertContext<'_>,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Result<(), ConvertError> {
        match self {
            Resolved::Custom(pair) => pair.to_message(cx, message, field, value),
            Resolved::Default => coerce::assign_to_message(message, field, value),
        }
    }

    pub fn from_message(
        &self,
        cx: &ConvertContext<'_>,
        record: &mut Record,
        record_field: &str,
        field: &FieldDescriptor,
        value: &ProtoValue,
    ) -> Result<(), ConvertError> {
        match self {
            Resolved::Custom(pair) => pair.from_message(cx, record, record_field, field, value),
            Resolved::Default => coerce::assign_to_record(record, record_field, value),
        }
    }
}
