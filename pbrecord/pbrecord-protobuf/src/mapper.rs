//! Recursive record ↔ message mapper.

use std::sync::Arc;

use pbrecord_core::{Record, RecordField, StorageKind, Value};
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, ReflectMessage, Value as ProtoValue};
use tracing::level_filters::LevelFilter;

use crate::{
    coerce::{proto_variant, set_field_value},
    collection::collection_pair,
    converter::{ConvertContext, ConverterRegistry, Lookup, Resolved},
    error::{ConvertError, MappingError},
    model::{ModelRegistry, ProtoModel},
    names::{FieldNameMap, MappedName},
};

/// Emit a tracing event only when `$level` passes the mapper's log level.
macro_rules! gated {
    ($mapper:expr, $level:ident, $($arg:tt)+) => {
        if tracing::Level::$level <= $mapper.options.log_level {
            tracing::event!(tracing::Level::$level, $($arg)+);
        }
    };
}

/// How `DateTime` fields are materialized from messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimePolicy {
    /// [`Value::DateTime`] in UTC.
    #[default]
    Aware,
    /// [`Value::NaiveDateTime`] holding the UTC wall-clock time.
    Naive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperOptions {
    pub time_policy: TimePolicy,
    /// Most verbose event level the mapper emits.
    pub log_level: LevelFilter,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            time_policy: TimePolicy::default(),
            log_level: LevelFilter::WARN,
        }
    }
}

/// Converts records to messages and back using a set of registered models.
#[derive(Debug)]
pub struct Mapper {
    registry: ModelRegistry,
    converters: ConverterRegistry,
    options: MapperOptions,
}

impl Mapper {
    pub fn new(registry: ModelRegistry) -> Self {
        Self::new_with_options(registry, MapperOptions::default())
    }

    pub fn new_with_options(registry: ModelRegistry, options: MapperOptions) -> Self {
        Self {
            registry,
            converters: ConverterRegistry::with_builtins(),
            options,
        }
    }

    /// Add mapper-wide converters on top of the built-ins.
    pub fn with_converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = self.converters.merged(&converters);
        self
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn model(&self, record_type: &str) -> Result<&Arc<ProtoModel>, MappingError> {
        self.registry
            .get(record_type)
            .ok_or_else(|| MappingError::UnregisteredModel {
                record_type: record_type.to_string(),
            })
    }

    pub fn new_record(&self, record_type: &str) -> Result<Record, MappingError> {
        Ok(self.model(record_type)?.new_record())
    }

    /// Pick the converter for a field of `model`: the emulated kind's own
    /// pair, then per-kind entries (model, then mapper-wide), then
    /// per-field entries, then the default. A malformed entry falls back to
    /// the default.
    pub fn resolve(&self, model: &ProtoModel, kind: StorageKind, schema_field: Option<&str>) -> Resolved {
        if let Some(pair) = collection_pair(kind) {
            return Resolved::Custom(pair);
        }
        let scopes = [("model", model.converters()), ("mapper", &self.converters)];
        let mut entries = scopes
            .iter()
            .map(|(scope, registry)| (*scope, registry.kind_entry(kind)))
            .collect::<Vec<_>>();
        if let Some(name) = schema_field {
            entries.extend(
                scopes
                    .iter()
                    .map(|(scope, registry)| (*scope, registry.field_entry(name))),
            );
        }
        for (scope, entry) in entries {
            match entry {
                Lookup::Missing => continue,
                Lookup::Found(pair) => return Resolved::Custom(pair),
                Lookup::Malformed(parts) => {
                    gated!(
                        self,
                        WARN,
                        record_type = model.name(),
                        %kind,
                        schema_field = ?schema_field,
                        scope,
                        parts,
                        "malformed converter registration, using default conversion"
                    );
                    return Resolved::Default;
                }
            }
        }
        Resolved::Default
    }

    /// Convert `record` to its model's message, following relations without
    /// a depth limit.
    pub fn to_message(&self, record: &Record) -> Result<DynamicMessage, MappingError> {
        self.to_message_with_depth(record, None)
    }

    /// Convert `record`, following at most `depth` relation hops. A
    /// relation met with a remaining depth of zero or less is left at its
    /// schema default.
    pub fn to_message_with_depth(
        &self,
        record: &Record,
        depth: Option<i32>,
    ) -> Result<DynamicMessage, MappingError> {
        let model = self.model(record.type_name())?;
        let cx = ConvertContext::new(self, depth);
        let mut message = DynamicMessage::new(model.schema().clone());
        self.fill_message(&cx, model, record, &mut message, model.field_name_map())?;
        gated!(
            self,
            INFO,
            record_type = model.name(),
            schema = %message.descriptor().full_name(),
            "converted record to message"
        );
        Ok(message)
    }

    fn fill_message(
        &self,
        cx: &ConvertContext<'_>,
        model: &ProtoModel,
        record: &Record,
        message: &mut DynamicMessage,
        names: &FieldNameMap,
    ) -> Result<(), MappingError> {
        for fd in message.descriptor().fields() {
            match names.lookup(fd.name()) {
                MappedName::Field(name) => self.field_to_message(cx, model, record, message, &fd, name)?,
                MappedName::Nested(nested) => {
                    let Kind::Message(sub_desc) = fd.kind() else {
                        gated!(self, WARN, record_type = model.name(), schema_field = fd.name(), "nested remap on a non-message field, skipping");
                        continue;
                    };
                    let mut sub = DynamicMessage::new(sub_desc);
                    self.fill_message(cx, model, record, &mut sub, nested)?;
                    if sub.fields().next().is_some() {
                        message
                            .try_set_field(&fd, ProtoValue::Message(sub))
                            .map_err(|e| self.field_error(model.name(), fd.name(), e.into()))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn field_to_message(
        &self,
        cx: &ConvertContext<'_>,
        model: &ProtoModel,
        record: &Record,
        message: &mut DynamicMessage,
        fd: &FieldDescriptor,
        name: &str,
    ) -> Result<(), MappingError> {
        let Some(field) = record.record_type().mappable_field(name) else {
            gated!(self, WARN, record_type = model.name(), schema_field = fd.name(), "no record field for schema field, skipping");
            return Ok(());
        };
        let value = record
            .get(name)
            .map_err(|e| self.field_error(model.name(), name, e.into()))?;
        if value.is_null() && field.nullable {
            return Ok(());
        }
        let resolved = self.resolve(model, field.kind, Some(fd.name()));
        let result = if is_plain_relation(field) && !resolved.is_custom() {
            self.relation_to_message(cx, model, message, fd, field, value)
        } else {
            gated!(self, DEBUG, record_type = model.name(), field = name, custom = resolved.is_custom(), "assigning message field");
            resolved.to_message(cx, message, fd, value)
        };
        result.map_err(|source| self.field_error(model.name(), name, source))
    }

    fn relation_to_message(
        &self,
        cx: &ConvertContext<'_>,
        model: &ProtoModel,
        message: &mut DynamicMessage,
        fd: &FieldDescriptor,
        field: &RecordField,
        value: &Value,
    ) -> Result<(), ConvertError> {
        if field.kind == StorageKind::Reverse {
            return Ok(());
        }
        if cx.depth().is_some_and(|depth| depth <= 0) {
            gated!(self, DEBUG, record_type = model.name(), field = %field.name, "depth exhausted, skipping relation");
            return Ok(());
        }
        gated!(self, DEBUG, record_type = model.name(), field = %field.name, depth = ?cx.depth(), "descending into relation");
        let below = cx.descend();
        match field.kind {
            StorageKind::ManyToMany => {
                model
                    .many_to_many_hook()
                    .to_message(&below, message, fd, value.try_records()?)
            }
            StorageKind::ForeignKey => {
                let Some(related) = value.try_record()? else {
                    return Ok(());
                };
                let converted = below.to_message(related)?;
                set_field_value(message, fd, ProtoValue::Message(converted))?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Build a record of type `record_type` from `message`.
    pub fn from_message(&self, record_type: &str, message: &DynamicMessage) -> Result<Record, MappingError> {
        let mut record = self.new_record(record_type)?;
        self.from_message_into(&mut record, message)?;
        Ok(record)
    }

    /// Apply the populated fields of `message` to `record`. Fields absent
    /// from the message keep their current value.
    ///
    /// The message may come from any descriptor pool; it must carry the
    /// model's message type, matched by full name.
    pub fn from_message_into(&self, record: &mut Record, message: &DynamicMessage) -> Result<(), MappingError> {
        let model = self.model(record.type_name())?;
        if message.descriptor().full_name() != model.schema().full_name() {
            return Err(MappingError::SchemaMismatch {
                record_type: model.name().to_string(),
                expected: model.schema().full_name().to_string(),
                actual: message.descriptor().full_name().to_string(),
            });
        }
        let cx = ConvertContext::new(self, None);
        self.fill_record(&cx, model, record, message, model.field_name_map())?;
        gated!(
            self,
            INFO,
            record_type = model.name(),
            schema = %message.descriptor().full_name(),
            "converted message to record"
        );
        Ok(())
    }

    fn fill_record(
        &self,
        cx: &ConvertContext<'_>,
        model: &ProtoModel,
        record: &mut Record,
        message: &DynamicMessage,
        names: &FieldNameMap,
    ) -> Result<(), MappingError> {
        for (fd, value) in message.fields() {
            match names.lookup(fd.name()) {
                MappedName::Field(name) => self.field_from_message(cx, model, record, &fd, name, value)?,
                MappedName::Nested(nested) => match value.as_message() {
                    Some(sub) => self.fill_record(cx, model, record, sub, nested)?,
                    None => {
                        gated!(self, WARN, record_type = model.name(), schema_field = fd.name(), "nested remap on a non-message value, skipping");
                    }
                },
            }
        }
        Ok(())
    }

    fn field_from_message(
        &self,
        cx: &ConvertContext<'_>,
        model: &ProtoModel,
        record: &mut Record,
        fd: &FieldDescriptor,
        name: &str,
        value: &ProtoValue,
    ) -> Result<(), MappingError> {
        let Some(field) = record.record_type().mappable_field(name).cloned() else {
            gated!(self, WARN, record_type = model.name(), schema_field = fd.name(), "no record field for schema field, skipping");
            return Ok(());
        };
        let resolved = self.resolve(model, field.kind, Some(fd.name()));
        let result = if is_plain_relation(&field)
            && !resolved.is_custom()
            && matches!(fd.kind(), Kind::Message(_))
        {
            self.relation_from_message(cx, model, record, fd, &field, value)
        } else {
            gated!(self, DEBUG, record_type = model.name(), field = name, custom = resolved.is_custom(), "assigning record field");
            resolved.from_message(cx, record, name, fd, value)
        };
        result.map_err(|source| self.field_error(model.name(), name, source))
    }

    fn relation_from_message(
        &self,
        cx: &ConvertContext<'_>,
        model: &ProtoModel,
        record: &mut Record,
        fd: &FieldDescriptor,
        field: &RecordField,
        value: &ProtoValue,
    ) -> Result<(), ConvertError> {
        match field.kind {
            StorageKind::ManyToMany => {
                model
                    .many_to_many_hook()
                    .from_message(cx, record, &field.name, fd, value)
            }
            StorageKind::ForeignKey => {
                let Some(sub) = value.as_message() else {
                    return Err(ConvertError::mismatch("message", proto_variant(value)));
                };
                let Some(related) = field.related.as_deref() else {
                    return Err(ConvertError::custom(format!(
                        "relation '{}' has no related record type",
                        field.name
                    )));
                };
                gated!(self, DEBUG, record_type = model.name(), field = %field.name, related, "building related record");
                let related_record = cx.from_message(related, sub)?;
                record.set(&field.name, related_record)?;
                Ok(())
            }
            _ => {
                gated!(self, WARN, record_type = model.name(), field = %field.name, "reverse relation in message, skipping");
                Ok(())
            }
        }
    }

    fn field_error(&self, record_type: &str, field: &str, source: ConvertError) -> MappingError {
        gated!(self, ERROR, record_type, field, error = %source, "field conversion failed");
        MappingError::Field {
            record_type: record_type.to_string(),
            field: field.to_string(),
            source,
        }
    }
}

/// Forward or reverse relation handled by the mapper itself rather than a
/// converter pair.
fn is_plain_relation(field: &RecordField) -> bool {
    field.kind.is_relation() && !field.kind.is_emulated_collection()
}
