//! Field selection and schema-to-record name remapping.

use std::collections::HashMap;

use prost_reflect::MessageDescriptor;

/// Which schema fields a model materializes record fields for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// Every field of the target message.
    All,
    /// The listed schema field names only.
    Only(Vec<String>),
}

impl Default for FieldSelection {
    fn default() -> Self {
        FieldSelection::Only(Vec::new())
    }
}

impl FieldSelection {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection::Only(names.into_iter().map(Into::into).collect())
    }

    /// Selection covering both `self` and `other`; `All` absorbs everything.
    pub fn union(&self, other: &FieldSelection) -> FieldSelection {
        match (self, other) {
            (FieldSelection::All, _) | (_, FieldSelection::All) => FieldSelection::All,
            (FieldSelection::Only(a), FieldSelection::Only(b)) => {
                let mut names = a.clone();
                names.extend(b.iter().filter(|n| !a.contains(n)).cloned());
                FieldSelection::Only(names)
            }
        }
    }

    /// Schema field names covered by this selection, in selection order
    /// (schema order for `All`).
    pub fn names(&self, schema: &MessageDescriptor) -> Vec<String> {
        match self {
            FieldSelection::All => schema.fields().map(|f| f.name().to_string()).collect(),
            FieldSelection::Only(names) => names.clone(),
        }
    }
}

/// Target of one schema field name in a [`FieldNameMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMapping {
    /// Store the schema field in a differently named record field.
    Rename(String),
    /// The schema field is a nested message whose own fields are remapped
    /// onto fields of the same record.
    Nested(FieldNameMap),
}

/// Resolved target of a schema field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedName<'a> {
    Field(&'a str),
    Nested(&'a FieldNameMap),
}

/// Schema field name → record field name, possibly nested.
/// Names absent from the map resolve to themselves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldNameMap(HashMap<String, FieldMapping>);

impl FieldNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, schema_field: impl Into<String>, record_field: impl Into<String>) -> Self {
        self.0
            .insert(schema_field.into(), FieldMapping::Rename(record_field.into()));
        self
    }

    pub fn nested(mut self, schema_field: impl Into<String>, map: FieldNameMap) -> Self {
        self.0.insert(schema_field.into(), FieldMapping::Nested(map));
        self
    }

    pub fn get(&self, schema_field: &str) -> Option<&FieldMapping> {
        self.0.get(schema_field)
    }

    pub fn lookup<'a>(&'a self, schema_field: &'a str) -> MappedName<'a> {
        match self.0.get(schema_field) {
            Some(FieldMapping::Rename(name)) => MappedName::Field(name),
            Some(FieldMapping::Nested(map)) => MappedName::Nested(map),
            None => MappedName::Field(schema_field),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldMapping)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self` with `overrides` applied on top; entries of `self` not set by
    /// `overrides` are kept.
    pub fn merged(&self, overrides: &FieldNameMap) -> FieldNameMap {
        let mut merged = self.0.clone();
        merged.extend(overrides.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        FieldNameMap(merged)
    }
}
