//! Record type definitions: named, typed, nullable fields.

use crate::{kind::StorageKind, value::Value};

/// Name of the identity field every record type carries.
pub const PRIMARY_KEY: &str = "id";

/// Name of the hidden auxiliary index field that backs the emulated
/// collection `owner`.
pub fn index_field_name(owner: &str) -> String {
    format!("{owner}_index")
}

/// Declared (or materialized) field of a [`RecordType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    pub kind: StorageKind,
    pub nullable: bool,
    /// Target record type name for relation kinds.
    pub related: Option<String>,
    /// Hidden fields are auxiliary indexes: excluded from mapping and from
    /// default serialization, and not settable through [`Record::set`](crate::Record::set).
    pub hidden: bool,
    /// True when synthesized from a message schema rather than declared.
    pub materialized: bool,
}

impl RecordField {
    /// A plain field. Kinds without a non-null default
    /// ([`StorageKind::is_always_nullable`]) start nullable.
    pub fn new(name: impl Into<String>, kind: StorageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: kind.is_always_nullable(),
            related: None,
            hidden: false,
            materialized: false,
        }
    }

    /// A relation field pointing at the record type named `related`.
    ///
    /// Single references are nullable; collections are not.
    pub fn relation(
        name: impl Into<String>,
        kind: StorageKind,
        related: impl Into<String>,
    ) -> Self {
        Self {
            related: Some(related.into()),
            ..Self::new(name, kind)
        }
    }

    /// The hidden index field backing the emulated collection `owner`.
    pub fn auxiliary_index(owner: &str) -> Self {
        Self {
            hidden: true,
            materialized: true,
            ..Self::new(index_field_name(owner), StorageKind::Json)
        }
    }

    /// The default identity field, null until a store assigns one.
    pub fn primary_key() -> Self {
        Self::new(PRIMARY_KEY, StorageKind::I64).with_nullable(true)
    }

    /// Ignored for kinds that are always nullable.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable || self.kind.is_always_nullable();
        self
    }

    pub fn with_materialized(mut self, materialized: bool) -> Self {
        self.materialized = materialized;
        self
    }

    /// Value a freshly created record holds for this field.
    ///
    /// Collections start empty even when nullable.
    pub fn default_value(&self) -> Value {
        match self.kind.default_value() {
            collection @ (Value::RecordList(_) | Value::RecordMap(_)) => collection,
            _ if self.nullable => Value::Null,
            value => value,
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        (self.nullable && value.is_null()) || self.kind.accepts(value)
    }
}

/// A named collection of record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    name: String,
    fields: Vec<RecordField>,
    primary_key: usize,
}

impl RecordType {
    /// Build a record type. A nullable `i64` [`PRIMARY_KEY`] field is
    /// prepended when `fields` does not declare one. Later duplicates of a
    /// field name are dropped.
    pub fn new(name: impl Into<String>, fields: Vec<RecordField>) -> Self {
        let mut unique: Vec<RecordField> = Vec::with_capacity(fields.len() + 1);
        if !fields.iter().any(|f| f.name == PRIMARY_KEY) {
            unique.push(RecordField::primary_key());
        }
        for field in fields {
            if !unique.iter().any(|f| f.name == field.name) {
                unique.push(field);
            }
        }
        let primary_key = unique
            .iter()
            .position(|f| f.name == PRIMARY_KEY)
            .unwrap_or_default();
        Self {
            name: name.into(),
            fields: unique,
            primary_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> impl Iterator<Item = &RecordField> {
        self.fields.iter()
    }

    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Like [`field`](Self::field) but never returns hidden index fields.
    pub fn mappable_field(&self, name: &str) -> Option<&RecordField> {
        self.field(name).filter(|f| !f.hidden)
    }

    pub fn primary_key(&self) -> &RecordField {
        &self.fields[self.primary_key]
    }

    pub fn emulated_collections(&self) -> impl Iterator<Item = &RecordField> {
        self.fields.iter().filter(|f| f.kind.is_emulated_collection())
    }
}
