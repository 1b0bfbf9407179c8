//! Error types for the record layer.

use crate::{kind::StorageKind, record::RecordId};

/// A [`Value`](crate::Value) did not hold the variant a caller asked for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, got {actual}")]
pub struct ValueTypeError {
    pub expected: String,
    pub actual: &'static str,
}

impl ValueTypeError {
    pub fn new(expected: impl Into<String>, actual: &'static str) -> Self {
        Self {
            expected: expected.into(),
            actual,
        }
    }
}

/// Reading or writing a named field on a [`Record`](crate::Record) failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldAccessError {
    /// The record type declares no field with this name.
    #[error("record type '{record_type}' has no field '{field}'")]
    UnknownField { record_type: String, field: String },

    /// Auxiliary index fields are maintained by the collection emulators only.
    #[error("field '{field}' of '{record_type}' is not settable")]
    NotSettable { record_type: String, field: String },

    /// An emulated collection was read before being loaded from the store.
    #[error("collection '{field}' of '{record_type}' has not been loaded")]
    NotLoaded { record_type: String, field: String },

    /// The value variant does not fit the field's storage kind.
    #[error("field '{field}' of '{record_type}' ({kind}) cannot hold {actual}")]
    KindMismatch {
        record_type: String,
        field: String,
        kind: StorageKind,
        actual: &'static str,
    },

    /// The identity does not fit the primary key's storage kind.
    #[error("id {id} does not fit field '{field}' of '{record_type}' ({kind})")]
    IdOutOfRange {
        record_type: String,
        field: String,
        kind: StorageKind,
        id: RecordId,
    },
}

/// Error returned by [`RecordStore`](crate::RecordStore) implementations and
/// the collection emulators.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record of this type carries the requested identity.
    #[error("{record_type} with id {id} not found")]
    NotFound { record_type: String, id: RecordId },

    /// The operation needs a record that has already been assigned an identity.
    #[error("{record_type} record has no identity")]
    MissingIdentity { record_type: String },

    /// The named field is not a repeated-message or message-map collection.
    #[error("field '{field}' of '{record_type}' is not an emulated collection")]
    NotACollection { record_type: String, field: String },

    /// The auxiliary index could not be encoded or decoded.
    #[error("invalid auxiliary index '{field}' on '{record_type}': {source}")]
    InvalidIndex {
        record_type: String,
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Access(#[from] FieldAccessError),

    /// Failure reported by an external store backend.
    #[error("record store failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
