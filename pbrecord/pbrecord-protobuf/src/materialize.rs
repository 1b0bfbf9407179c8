//! Field materialization: synthesize record fields from a message schema.

use std::collections::HashMap;

use pbrecord_core::{RecordField, StorageKind, index_field_name};
use prost_reflect::{FieldDescriptor, MessageDescriptor};
use tracing::debug;

use crate::{
    classify::{FieldClass, ScalarKind, classify, related_message},
    error::DefinitionError,
    model::ModelRegistry,
    names::{FieldNameMap, FieldSelection, MappedName},
};

/// Field class → storage kind used for materialized fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindTable(HashMap<FieldClass, StorageKind>);

impl Default for KindTable {
    fn default() -> Self {
        let scalars = [
            (ScalarKind::F32, StorageKind::F32),
            (ScalarKind::F64, StorageKind::F64),
            (ScalarKind::I32, StorageKind::I32),
            (ScalarKind::I64, StorageKind::I64),
            (ScalarKind::U32, StorageKind::U32),
            (ScalarKind::U64, StorageKind::U64),
            (ScalarKind::Bool, StorageKind::Bool),
            (ScalarKind::String, StorageKind::String),
            (ScalarKind::Bytes, StorageKind::Bytes),
            (ScalarKind::Enum, StorageKind::I32),
        ];
        let shapes = [
            (FieldClass::Timestamp, StorageKind::DateTime),
            (FieldClass::RepeatedScalar, StorageKind::List),
            (FieldClass::ScalarMap, StorageKind::Map),
            (FieldClass::Message, StorageKind::ForeignKey),
            (FieldClass::RepeatedMessage, StorageKind::RepeatedMessage),
            (FieldClass::MessageMap, StorageKind::MessageMap),
        ];
        Self(
            scalars
                .into_iter()
                .map(|(scalar, kind)| (FieldClass::Scalar(scalar), kind))
                .chain(shapes)
                .collect(),
        )
    }
}

impl KindTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn with(mut self, class: FieldClass, kind: StorageKind) -> Self {
        self.set(class, kind);
        self
    }

    pub fn set(&mut self, class: FieldClass, kind: StorageKind) {
        self.0.insert(class, kind);
    }

    pub fn remove(&mut self, class: FieldClass) -> Option<StorageKind> {
        self.0.remove(&class)
    }

    pub fn get(&self, class: FieldClass) -> Option<StorageKind> {
        self.0.get(&class).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self` with `overrides` applied; entries not set by `overrides` keep
    /// their value from `self`.
    pub fn merged(&self, overrides: &KindTable) -> KindTable {
        let mut merged = self.0.clone();
        merged.extend(overrides.0.iter().map(|(class, kind)| (*class, *kind)));
        KindTable(merged)
    }
}

/// Inputs to one materialization pass over a model's target schema.
pub struct Materializer<'a> {
    pub record_type: &'a str,
    pub schema: &'a MessageDescriptor,
    pub selection: &'a FieldSelection,
    pub names: &'a FieldNameMap,
    /// Fields declared by hand, which are never re-synthesized.
    pub declared: &'a [RecordField],
    pub kind_table: &'a KindTable,
    /// Models that relation targets are resolved against.
    pub registry: &'a ModelRegistry,
}

impl Materializer<'_> {
    /// Synthesize a record field for every selected schema field that is
    /// neither declared nor a nested remap. Emulated collections also get
    /// their hidden index field.
    pub fn materialize(&self) -> Result<Vec<RecordField>, DefinitionError> {
        let mut fields: Vec<RecordField> = Vec::new();
        for schema_name in self.selection.names(self.schema) {
            let Some(fd) = self.schema.get_field_by_name(&schema_name) else {
                return Err(DefinitionError::UnknownSchemaField {
                    record_type: self.record_type.to_string(),
                    message: self.schema.full_name().to_string(),
                    field: schema_name,
                });
            };
            let name = match self.names.lookup(&schema_name) {
                MappedName::Field(name) => name.to_string(),
                MappedName::Nested(_) => continue,
            };
            if self.is_declared(&name) || fields.iter().any(|f| f.name == name) {
                continue;
            }

            let class = classify(&fd);
            let kind = self
                .kind_table
                .get(class)
                .ok_or_else(|| DefinitionError::MissingClassification {
                    record_type: self.record_type.to_string(),
                    field: schema_name.clone(),
                    class,
                })?;
            let field = if kind.is_relation() {
                self.relation_field(&name, &fd, kind)?
            } else {
                RecordField::new(&name, kind).with_materialized(true)
            };
            debug!(
                record_type = self.record_type,
                field = %field.name,
                kind = %field.kind,
                "materialized field"
            );
            fields.push(field);
            if kind.is_emulated_collection() && !self.is_declared(&index_field_name(&name)) {
                fields.push(RecordField::auxiliary_index(&name));
            }
        }
        Ok(fields)
    }

    fn is_declared(&self, name: &str) -> bool {
        self.declared.iter().any(|f| f.name == name)
    }

    fn relation_field(
        &self,
        name: &str,
        fd: &FieldDescriptor,
        kind: StorageKind,
    ) -> Result<RecordField, DefinitionError> {
        let unsupported = || DefinitionError::UnsupportedKind {
            record_type: self.record_type.to_string(),
            field: fd.name().to_string(),
            kind,
        };
        if kind == StorageKind::Reverse {
            return Err(unsupported());
        }
        let target = related_message(fd).ok_or_else(unsupported)?;
        let related = if target.full_name() == self.schema.full_name() {
            self.record_type.to_string()
        } else {
            self.registry
                .for_message(target.full_name())
                .map(|model| model.name().to_string())
                .ok_or_else(|| DefinitionError::UnregisteredTarget {
                    record_type: self.record_type.to_string(),
                    field: fd.name().to_string(),
                    message: target.full_name().to_string(),
                })?
        };
        Ok(RecordField::relation(name, kind, related).with_materialized(true))
    }
}
