//! Record instances.

use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{
    error::FieldAccessError,
    kind::StorageKind,
    record_type::{RecordField, RecordType},
    value::Value,
};

static NULL: Value = Value::Null;

/// Identity assigned to a record by its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a [`RecordType`].
///
/// Emulated collections are tracked separately: a record built with
/// [`Record::new`] starts with every collection empty and loaded, while a
/// [`detached`](Record::detached) copy (what stores hand back) has them
/// unloaded until [`load_collection`](crate::load_collection) runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    record_type: Arc<RecordType>,
    values: HashMap<String, Value>,
    loaded: HashSet<String>,
}

impl Record {
    pub fn new(record_type: Arc<RecordType>) -> Self {
        let mut values = HashMap::new();
        let mut loaded = HashSet::new();
        for field in record_type.fields() {
            values.insert(field.name.clone(), field.default_value());
            if field.kind.is_emulated_collection() {
                loaded.insert(field.name.clone());
            }
        }
        Self {
            record_type,
            values,
            loaded,
        }
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn type_name(&self) -> &str {
        self.record_type.name()
    }

    /// Read a field. Hidden index fields are readable; emulated collections
    /// must be loaded first.
    pub fn get(&self, name: &str) -> Result<&Value, FieldAccessError> {
        let field = self.field(name)?;
        if field.kind.is_emulated_collection() && !self.loaded.contains(name) {
            return Err(FieldAccessError::NotLoaded {
                record_type: self.type_name().to_string(),
                field: name.to_string(),
            });
        }
        Ok(self.values.get(name).unwrap_or(&NULL))
    }

    /// Assign a field. Assigning an emulated collection makes the in-memory
    /// value authoritative until the next save.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), FieldAccessError> {
        let field = self.field(name)?;
        if field.hidden {
            return Err(FieldAccessError::NotSettable {
                record_type: self.type_name().to_string(),
                field: name.to_string(),
            });
        }
        self.assign(name, value.into())
    }

    pub fn id(&self) -> Option<RecordId> {
        match self.values.get(&self.record_type.primary_key().name)? {
            Value::I64(v) => Some(RecordId(*v)),
            Value::I32(v) => Some(RecordId(i64::from(*v))),
            Value::U32(v) => Some(RecordId(i64::from(*v))),
            Value::U64(v) => i64::try_from(*v).ok().map(RecordId),
            _ => None,
        }
    }

    /// Write the identity field; used by [`RecordStore`](crate::RecordStore)
    /// implementations when they assign one.
    pub fn set_id(&mut self, id: RecordId) -> Result<(), FieldAccessError> {
        let pk = self.record_type.primary_key().clone();
        let value = match pk.kind {
            StorageKind::I32 => i32::try_from(id.0).map(Value::I32).ok(),
            StorageKind::U32 => u32::try_from(id.0).map(Value::U32).ok(),
            StorageKind::U64 => u64::try_from(id.0).map(Value::U64).ok(),
            _ => Some(Value::I64(id.0)),
        };
        let value = value.ok_or_else(|| FieldAccessError::IdOutOfRange {
            record_type: self.type_name().to_string(),
            field: pk.name.clone(),
            kind: pk.kind,
            id,
        })?;
        self.assign(&pk.name, value)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    /// Copy of this record without any loaded collection, as persisted.
    pub fn detached(&self) -> Record {
        let mut record = self.clone();
        for field in self.record_type.emulated_collections() {
            record.values.remove(&field.name);
            record.loaded.remove(&field.name);
        }
        record
    }

    pub(crate) fn value_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }

    /// Write a hidden index field.
    pub(crate) fn set_index(&mut self, name: &str, value: Value) -> Result<(), FieldAccessError> {
        self.field(name)?;
        self.assign(name, value)
    }

    fn field(&self, name: &str) -> Result<&RecordField, FieldAccessError> {
        self.record_type
            .field(name)
            .ok_or_else(|| FieldAccessError::UnknownField {
                record_type: self.type_name().to_string(),
                field: name.to_string(),
            })
    }

    fn assign(&mut self, name: &str, value: Value) -> Result<(), FieldAccessError> {
        let field = self.field(name)?;
        if !field.accepts(&value) {
            return Err(FieldAccessError::KindMismatch {
                record_type: self.type_name().to_string(),
                field: name.to_string(),
                kind: field.kind,
                actual: value.variant_name(),
            });
        }
        if field.kind.is_emulated_collection() {
            self.loaded.insert(name.to_string());
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }
}

/// Default serialization: every non-hidden field, skipping collections that
/// have not been loaded.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let visible: Vec<&RecordField> = self
            .record_type
            .fields()
            .filter(|f| !f.hidden)
            .filter(|f| !f.kind.is_emulated_collection() || self.loaded.contains(&f.name))
            .collect();
        let mut map = serializer.serialize_map(Some(visible.len()))?;
        for field in visible {
            map.serialize_entry(&field.name, self.values.get(&field.name).unwrap_or(&NULL))?;
        }
        map.end()
    }
}
