//! Record model and storage contracts for `pbrecord`.
//!
//! This crate is schema-agnostic: it knows nothing about protobuf. It provides
//! the record side of the mapping ([`RecordType`], [`Record`], [`Value`]), the
//! [`RecordStore`] contract with an in-memory reference implementation, and
//! the storage half of the emulated collections (repeated-message and
//! message-map fields) which keep their members in an [`AuxiliaryIndex`].

mod collection;
mod error;
mod index;
mod kind;
mod record;
mod record_type;
mod store;
mod value;

pub use collection::{load_collection, load_collections, save_collection, save_record};
pub use error::{FieldAccessError, StoreError, ValueTypeError};
pub use index::AuxiliaryIndex;
pub use kind::StorageKind;
pub use record::{Record, RecordId};
pub use record_type::{PRIMARY_KEY, RecordField, RecordType, index_field_name};
pub use store::{MemoryStore, RecordStore};
pub use value::{MapKey, Value};
