//! Error types for model definition and message conversion.

use pbrecord_core::{FieldAccessError, StorageKind, ValueTypeError};

use crate::classify::FieldClass;

/// Configuration error raised while building a model definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// A selected or remapped schema field does not exist on the message.
    #[error("message '{message}' of model '{record_type}' has no field '{field}'")]
    UnknownSchemaField {
        record_type: String,
        message: String,
        field: String,
    },

    /// The classification table has no storage kind for a field's class.
    #[error("no storage kind for {class:?} field '{field}' of model '{record_type}'")]
    MissingClassification {
        record_type: String,
        field: String,
        class: FieldClass,
    },

    /// A remapped schema field points at a record field that does not exist.
    #[error("schema field '{schema_field}' of model '{record_type}' maps to missing field '{record_field}'")]
    UnresolvedField {
        record_type: String,
        schema_field: String,
        record_field: String,
    },

    /// A relation's target message has no registered model.
    #[error("field '{field}' of model '{record_type}' targets unregistered message '{message}'")]
    UnregisteredTarget {
        record_type: String,
        field: String,
        message: String,
    },

    /// A relation kind was assigned to a field that carries no message.
    #[error("field '{field}' of model '{record_type}' cannot be stored as {kind}")]
    UnsupportedKind {
        record_type: String,
        field: String,
        kind: StorageKind,
    },

    /// A nested remap was given for a schema field that is not a message.
    #[error("schema field '{field}' of model '{record_type}' is not a message and cannot be remapped as nested")]
    NotAMessage { record_type: String, field: String },

    #[error("model '{record_type}' is already registered")]
    DuplicateModel { record_type: String },
}

/// Failure converting a single value in either direction.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("{value} does not fit in {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("timestamp out of range: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: i32 },

    #[error(transparent)]
    Access(#[from] FieldAccessError),

    #[error(transparent)]
    Value(#[from] ValueTypeError),

    #[error(transparent)]
    SetField(#[from] prost_reflect::SetFieldError),

    /// Converting a related or element record failed.
    #[error(transparent)]
    Mapping(Box<MappingError>),

    /// Raised by user-supplied converters.
    #[error("{0}")]
    Custom(String),
}

impl ConvertError {
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

impl From<MappingError> for ConvertError {
    fn from(value: MappingError) -> Self {
        Self::Mapping(Box::new(value))
    }
}

/// Error returned by [`Mapper`](crate::Mapper) conversions. Any partially
/// built message or record must be discarded.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("cannot convert field '{field}' of '{record_type}': {source}")]
    Field {
        record_type: String,
        field: String,
        #[source]
        source: ConvertError,
    },

    #[error("no model registered for record type '{record_type}'")]
    UnregisteredModel { record_type: String },

    #[error("model '{record_type}' maps to '{expected}', got message '{actual}'")]
    SchemaMismatch {
        record_type: String,
        expected: String,
        actual: String,
    },
}
