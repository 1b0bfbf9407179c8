//! Auxiliary index backing the emulated collections.

use crate::{
    kind::StorageKind,
    record::RecordId,
    value::{MapKey, Value},
};

/// Persisted identifiers of the members of an emulated collection.
///
/// Repeated-message collections keep an ordered list; message maps keep
/// key/identifier pairs. The index is stored as JSON in the hidden
/// `<name>_index` field next to the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxiliaryIndex {
    List(Vec<RecordId>),
    Map(Vec<(MapKey, RecordId)>),
}

impl AuxiliaryIndex {
    /// Empty index of the shape used by `kind`.
    pub fn empty(kind: StorageKind) -> Self {
        match kind {
            StorageKind::MessageMap => AuxiliaryIndex::Map(Vec::new()),
            _ => AuxiliaryIndex::List(Vec::new()),
        }
    }

    /// Decode the stored index of a `kind` collection. A JSON `null` (never
    /// saved) decodes to an empty index.
    pub fn decode(kind: StorageKind, stored: &Value) -> Result<Self, serde_json::Error> {
        let json = match stored {
            Value::Json(serde_json::Value::Null) | Value::Null => return Ok(Self::empty(kind)),
            Value::Json(json) => json.clone(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected JSON index, got {}",
                    other.variant_name()
                )));
            }
        };
        match kind {
            StorageKind::MessageMap => serde_json::from_value(json).map(AuxiliaryIndex::Map),
            _ => serde_json::from_value(json).map(AuxiliaryIndex::List),
        }
    }

    pub fn encode(&self) -> Result<Value, serde_json::Error> {
        let json = match self {
            AuxiliaryIndex::List(ids) => serde_json::to_value(ids)?,
            AuxiliaryIndex::Map(entries) => serde_json::to_value(entries)?,
        };
        Ok(Value::Json(json))
    }

    pub fn len(&self) -> usize {
        match self {
            AuxiliaryIndex::List(ids) => ids.len(),
            AuxiliaryIndex::Map(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
