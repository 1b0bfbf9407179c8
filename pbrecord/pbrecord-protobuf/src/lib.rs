//! Protobuf side of `pbrecord`: binds record types to message schemas and
//! converts records to [`DynamicMessage`](prost_reflect::DynamicMessage)s
//! and back.
//!
//! A [`ModelDef`] names a record type, its target message and which schema
//! fields to materialize. Building it classifies each selected field
//! ([`classify`]), synthesizes record fields through a [`KindTable`] and
//! registers the resulting [`ProtoModel`] in a [`ModelRegistry`]. A
//! [`Mapper`] over that registry then performs the recursive conversion,
//! choosing a converter per field from [`ConverterRegistry`] entries.

mod builtin;
mod classify;
mod coerce;
mod collection;
mod converter;
mod error;
mod hook;
mod mapper;
mod materialize;
mod model;
mod names;

pub use builtin::{timestamp_pair, uuid_pair};
pub use classify::{FieldClass, ScalarKind, TIMESTAMP_MESSAGE, classify, scalar_kind};
pub use coerce::{insert_map_entry, proto_to_value, push_element, scalar_to_proto};
pub use collection::collection_pair;
pub use converter::{
    ConvertContext, ConverterPair, ConverterPart, ConverterRegistry, FromMessageFn, Resolved,
    ToMessageFn,
};
pub use error::{ConvertError, DefinitionError, MappingError};
pub use hook::{DefaultManyToMany, ManyToManyHook};
pub use mapper::{Mapper, MapperOptions, TimePolicy};
pub use materialize::{KindTable, Materializer};
pub use model::{ModelDef, ModelRegistry, ProtoModel};
pub use names::{FieldMapping, FieldNameMap, FieldSelection, MappedName};
