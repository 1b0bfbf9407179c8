//! Model definitions: a record type bound to a message schema.

use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

use pbrecord_core::{PRIMARY_KEY, Record, RecordField, RecordType, index_field_name};
use prost_reflect::{Kind, MessageDescriptor};
use tracing::info;

use crate::{
    converter::ConverterRegistry,
    error::DefinitionError,
    hook::{DefaultManyToMany, ManyToManyHook},
    materialize::{KindTable, Materializer},
    names::{FieldMapping, FieldNameMap, FieldSelection},
};

/// Builder for a [`ProtoModel`].
///
/// ```ignore
/// let model = ModelDef::new("Main", main_desc)
///     .field(RecordField::relation("m2m", StorageKind::ManyToMany, "Relation"))
///     .select(FieldSelection::All)
///     .field_name_map(FieldNameMap::new().rename("uint32_field", "uint32_field_renamed"))
///     .build(&mut registry)?;
/// ```
pub struct ModelDef {
    name: String,
    schema: MessageDescriptor,
    base: Option<Arc<ProtoModel>>,
    fields: Vec<RecordField>,
    selection: FieldSelection,
    names: FieldNameMap,
    converters: ConverterRegistry,
    kind_overrides: KindTable,
    kind_base: Option<KindTable>,
    many_to_many: Option<Arc<dyn ManyToManyHook>>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>, schema: MessageDescriptor) -> Self {
        Self::with_base(name.into(), schema, None)
    }

    /// Derive from `base`, inheriting its schema, declared fields and
    /// mapping configuration. The base model is left untouched.
    pub fn extends(name: impl Into<String>, base: &Arc<ProtoModel>) -> Self {
        Self::with_base(name.into(), base.schema.clone(), Some(base.clone()))
    }

    fn with_base(name: String, schema: MessageDescriptor, base: Option<Arc<ProtoModel>>) -> Self {
        Self {
            name,
            schema,
            base,
            fields: Vec::new(),
            selection: FieldSelection::default(),
            names: FieldNameMap::default(),
            converters: ConverterRegistry::default(),
            kind_overrides: KindTable::empty(),
            kind_base: None,
            many_to_many: None,
        }
    }

    /// Replace the target message schema.
    pub fn schema(mut self, schema: MessageDescriptor) -> Self {
        self.schema = schema;
        self
    }

    /// Declare a record field by hand. Declared fields replace inherited
    /// ones of the same name and are never materialized over.
    pub fn field(mut self, field: RecordField) -> Self {
        self.fields.retain(|f| f.name != field.name);
        self.fields.push(field);
        self
    }

    pub fn select(mut self, selection: FieldSelection) -> Self {
        self.selection = self.selection.union(&selection);
        self
    }

    pub fn field_name_map(mut self, names: FieldNameMap) -> Self {
        self.names = self.names.merged(&names);
        self
    }

    /// Per-kind and per-field converter overrides for this model.
    pub fn converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = self.converters.merged(&converters);
        self
    }

    /// Entries merged over the inherited (or default) classification table.
    pub fn kind_table(mut self, overrides: KindTable) -> Self {
        self.kind_overrides = self.kind_overrides.merged(&overrides);
        self
    }

    /// Use exactly `table` as the base classification table instead of the
    /// inherited or default one.
    pub fn replace_kind_table(mut self, table: KindTable) -> Self {
        self.kind_base = Some(table);
        self
    }

    pub fn many_to_many_hook(mut self, hook: impl ManyToManyHook + 'static) -> Self {
        self.many_to_many = Some(Arc::new(hook));
        self
    }

    /// Materialize the record type and register the model.
    pub fn build(self, registry: &mut ModelRegistry) -> Result<Arc<ProtoModel>, DefinitionError> {
        let name = self.name;
        if registry.get(&name).is_some() {
            return Err(DefinitionError::DuplicateModel { record_type: name });
        }
        let base = self.base.as_deref();

        let schema = self.schema;
        let selection = base.map_or(self.selection.clone(), |b| b.selection.union(&self.selection));
        let names = base.map_or(self.names.clone(), |b| b.names.merged(&self.names));
        let converters = base.map_or(self.converters.clone(), |b| {
            b.converters.merged(&self.converters)
        });
        let kind_table = self
            .kind_base
            .or_else(|| base.map(|b| b.kind_table.clone()))
            .unwrap_or_default()
            .merged(&self.kind_overrides);
        let many_to_many = self
            .many_to_many
            .or_else(|| base.map(|b| b.many_to_many.clone()))
            .unwrap_or_else(|| Arc::new(DefaultManyToMany));

        let mut declared = base.map(|b| b.declared.clone()).unwrap_or_default();
        for field in self.fields {
            declared.retain(|f| f.name != field.name);
            declared.push(field);
        }
        if !declared.iter().any(|f| f.name == PRIMARY_KEY) {
            declared.insert(0, RecordField::primary_key());
        }
        let indexes: Vec<RecordField> = declared
            .iter()
            .filter(|f| f.kind.is_emulated_collection())
            .filter(|f| !declared.iter().any(|d| d.name == index_field_name(&f.name)))
            .map(|f| RecordField::auxiliary_index(&f.name))
            .collect();
        declared.extend(indexes);

        let materialized = Materializer {
            record_type: &name,
            schema: &schema,
            selection: &selection,
            names: &names,
            declared: &declared,
            kind_table: &kind_table,
            registry: &*registry,
        }
        .materialize()?;

        let mut fields = declared.clone();
        fields.extend(materialized);
        let record_type = RecordType::new(name.clone(), fields);
        for schema_name in selection.names(&schema) {
            if let Some(FieldMapping::Nested(nested)) = names.get(&schema_name) {
                check_nested(&record_type, &schema, &schema_name, nested)?;
            }
        }

        let model = Arc::new(ProtoModel {
            record_type: Arc::new(record_type),
            schema,
            selection,
            names,
            converters,
            kind_table,
            declared,
            many_to_many,
        });
        info!(
            record_type = %name,
            schema = model.schema.full_name(),
            fields = model.record_type.fields().count(),
            "registered model"
        );
        registry.insert(model.clone());
        Ok(model)
    }
}

/// Check that every leaf of a nested remap names a record field.
fn check_nested(
    record_type: &RecordType,
    schema: &MessageDescriptor,
    schema_name: &str,
    nested: &FieldNameMap,
) -> Result<(), DefinitionError> {
    let unknown = |message: &MessageDescriptor, field: &str| DefinitionError::UnknownSchemaField {
        record_type: record_type.name().to_string(),
        message: message.full_name().to_string(),
        field: field.to_string(),
    };
    let fd = schema
        .get_field_by_name(schema_name)
        .ok_or_else(|| unknown(schema, schema_name))?;
    let Kind::Message(sub_schema) = fd.kind() else {
        return Err(DefinitionError::NotAMessage {
            record_type: record_type.name().to_string(),
            field: schema_name.to_string(),
        });
    };
    for (sub_name, mapping) in nested.iter() {
        match mapping {
            FieldMapping::Rename(record_field) => {
                if sub_schema.get_field_by_name(sub_name).is_none() {
                    return Err(unknown(&sub_schema, sub_name));
                }
                if record_type.mappable_field(record_field).is_none() {
                    return Err(DefinitionError::UnresolvedField {
                        record_type: record_type.name().to_string(),
                        schema_field: format!("{schema_name}.{sub_name}"),
                        record_field: record_field.clone(),
                    });
                }
            }
            FieldMapping::Nested(inner) => check_nested(record_type, &sub_schema, sub_name, inner)?,
        }
    }
    Ok(())
}

/// A record type bound to its target message schema.
pub struct ProtoModel {
    record_type: Arc<RecordType>,
    schema: MessageDescriptor,
    selection: FieldSelection,
    names: FieldNameMap,
    converters: ConverterRegistry,
    kind_table: KindTable,
    /// Hand-declared fields, including the identity and index fields,
    /// carried over to derived models.
    declared: Vec<RecordField>,
    many_to_many: Arc<dyn ManyToManyHook>,
}

impl ProtoModel {
    pub fn name(&self) -> &str {
        self.record_type.name()
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn schema(&self) -> &MessageDescriptor {
        &self.schema
    }

    pub fn selection(&self) -> &FieldSelection {
        &self.selection
    }

    pub fn field_name_map(&self) -> &FieldNameMap {
        &self.names
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn kind_table(&self) -> &KindTable {
        &self.kind_table
    }

    pub fn many_to_many_hook(&self) -> &dyn ManyToManyHook {
        self.many_to_many.as_ref()
    }

    pub fn new_record(&self) -> Record {
        Record::new(self.record_type.clone())
    }
}

impl Debug for ProtoModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtoModel")
            .field("record_type", &self.record_type)
            .field("schema", &self.schema.full_name())
            .field("selection", &self.selection)
            .field("names", &self.names)
            .field("converters", &self.converters)
            .field("kind_table", &self.kind_table)
            .finish_non_exhaustive()
    }
}

/// Built models, by record type name and by message full name.
#[derive(Debug, Default, Clone)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<ProtoModel>>,
    by_message: HashMap<String, String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, record_type: &str) -> Option<&Arc<ProtoModel>> {
        self.models.get(record_type)
    }

    /// The first model registered for the message `full_name`.
    pub fn for_message(&self, full_name: &str) -> Option<&Arc<ProtoModel>> {
        self.by_message
            .get(full_name)
            .and_then(|name| self.models.get(name))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    fn insert(&mut self, model: Arc<ProtoModel>) {
        let name = model.name().to_string();
        self.by_message
            .entry(model.schema.full_name().to_string())
            .or_insert_with(|| name.clone());
        self.models.insert(name, model);
    }
}
