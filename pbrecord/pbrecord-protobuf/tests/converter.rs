mod test_helpers;

use pbrecord_core::{RecordField, StorageKind, Value};
use pbrecord_protobuf::{
    ConverterPair, ConverterPart, ConverterRegistry, FieldSelection, Mapper, ModelDef,
    ModelRegistry,
};
use prost_reflect::{DynamicMessage, Value as ProtoValue};
use test_helpers::*;
use uuid::Uuid;

/// Pair writing `tag` into string fields in both directions.
fn tagging_pair(tag: &'static str) -> ConverterPair {
    ConverterPair::new(
        move |_cx, message, field, _value| {
            message.try_set_field(field, ProtoValue::String(tag.to_string()))?;
            Ok(())
        },
        move |_cx, record, name, _field, _value| {
            record.set(name, tag)?;
            Ok(())
        },
    )
}

fn tagging_parts(tag: &'static str) -> Vec<ConverterPart> {
    tagging_pair(tag).into_parts()
}

fn mapper_with(converters: ConverterRegistry, mapper_wide: ConverterRegistry) -> Mapper {
    let pool = models_pool();
    let mut registry = ModelRegistry::new();
    ModelDef::new("Relation", desc(&pool, "Relation"))
        .select(FieldSelection::All)
        .build(&mut registry)
        .unwrap();
    ModelDef::new("Main", desc(&pool, "Main"))
        .field(RecordField::new("uuid_field", StorageKind::Uuid).with_nullable(true))
        .select(FieldSelection::only(["string_field", "fk"]))
        .converters(converters)
        .build(&mut registry)
        .unwrap();
    Mapper::new(registry).with_converters(mapper_wide)
}

fn string_field_after_round_trip(mapper: &Mapper) -> (String, Value) {
    let mut main = mapper.new_record("Main").unwrap();
    main.set("string_field", "original").unwrap();
    let message = mapper.to_message(&main).unwrap();
    let sent = message
        .get_field_by_name("string_field")
        .unwrap()
        .as_str()
        .unwrap()
        .to_string();
    let back = mapper.from_message("Main", &message).unwrap();
    (sent, back.get("string_field").unwrap().clone())
}

#[test]
fn pairs_need_one_part_of_each_direction() {
    let [to, from]: [ConverterPart; 2] = tagging_parts("x").try_into().unwrap();

    assert!(ConverterPair::from_parts(&[to.clone(), from.clone()]).is_some());
    assert!(ConverterPair::from_parts(&[from.clone(), to.clone()]).is_some());
    assert!(ConverterPair::from_parts(&[to.clone()]).is_none());
    assert!(ConverterPair::from_parts(&[to.clone(), to.clone()]).is_none());
    assert!(ConverterPair::from_parts(&[to, from.clone(), from]).is_none());
    assert!(ConverterPair::from_parts(&[]).is_none());
}

#[test]
fn default_conversion_copies_values() {
    let mapper = mapper_with(ConverterRegistry::new(), ConverterRegistry::new());
    let (sent, back) = string_field_after_round_trip(&mapper);
    assert_eq!(sent, "original");
    assert_eq!(back, Value::string("original"));
}

#[test]
fn per_field_converter_is_used() {
    let mapper = mapper_with(
        ConverterRegistry::new().with_field("string_field", tagging_pair("field")),
        ConverterRegistry::new(),
    );
    let (sent, back) = string_field_after_round_trip(&mapper);
    assert_eq!(sent, "field");
    assert_eq!(back, Value::string("field"));
}

#[test]
fn per_kind_converter_beats_per_field() {
    let mapper = mapper_with(
        ConverterRegistry::new()
            .with_field("string_field", tagging_pair("field"))
            .with_kind(StorageKind::String, tagging_pair("kind")),
        ConverterRegistry::new(),
    );
    let (sent, _) = string_field_after_round_trip(&mapper);
    assert_eq!(sent, "kind");
}

#[test]
fn model_entries_beat_mapper_wide_entries() {
    let mapper = mapper_with(
        ConverterRegistry::new().with_kind(StorageKind::String, tagging_pair("model")),
        ConverterRegistry::new().with_kind(StorageKind::String, tagging_pair("mapper")),
    );
    let (sent, _) = string_field_after_round_trip(&mapper);
    assert_eq!(sent, "model");

    let mapper = mapper_with(
        ConverterRegistry::new().with_field("string_field", tagging_pair("model-field")),
        ConverterRegistry::new().with_kind(StorageKind::String, tagging_pair("mapper-kind")),
    );
    let (sent, _) = string_field_after_round_trip(&mapper);
    assert_eq!(sent, "mapper-kind");
}

#[test]
fn malformed_registration_falls_back_to_default() {
    let mut converters = ConverterRegistry::new();
    let mut parts = tagging_parts("broken");
    parts.truncate(1);
    converters.register_field_parts("string_field", parts);

    let mapper = mapper_with(converters, ConverterRegistry::new());
    let (sent, back) = string_field_after_round_trip(&mapper);
    assert_eq!(sent, "original");
    assert_eq!(back, Value::string("original"));
}

#[test]
fn oversized_registration_falls_back_to_default() {
    let mut parts = tagging_parts("broken");
    parts.extend(tagging_parts("extra"));
    let mut converters = ConverterRegistry::new();
    converters.register_kind_parts(StorageKind::String, parts);

    let mapper = mapper_with(converters, ConverterRegistry::new());
    let (sent, _) = string_field_after_round_trip(&mapper);
    assert_eq!(sent, "original");
}

#[test]
fn merged_registry_prefers_overrides() {
    let base = ConverterRegistry::new().with_kind(StorageKind::String, tagging_pair("base"));
    let merged = base.merged(&ConverterRegistry::new().with_kind(StorageKind::String, tagging_pair("override")));

    let mapper = mapper_with(merged, ConverterRegistry::new());
    let (sent, _) = string_field_after_round_trip(&mapper);
    assert_eq!(sent, "override");
}

#[test]
fn model_converter_replaces_builtin() {
    let mapper = mapper_with(
        ConverterRegistry::new().with_kind(
            StorageKind::Uuid,
            ConverterPair::new(
                |_cx, message, field, _value| {
                    message.try_set_field(field, ProtoValue::String("custom-uuid".to_string()))?;
                    Ok(())
                },
                |_cx, _record, _name, _field, _value| Ok(()),
            ),
        ),
        ConverterRegistry::new(),
    );
    let mut main = mapper.new_record("Main").unwrap();
    main.set("uuid_field", Uuid::nil()).unwrap();

    let message = mapper.to_message(&main).unwrap();
    assert_eq!(
        message.get_field_by_name("uuid_field").unwrap().as_str(),
        Some("custom-uuid")
    );
    let back = mapper.from_message("Main", &message).unwrap();
    assert_eq!(back.get("uuid_field").unwrap(), &Value::Null);
}

#[test]
fn emulated_kinds_always_use_their_own_pair() {
    let mapper = mapper_with(
        ConverterRegistry::new().with_kind(StorageKind::RepeatedMessage, tagging_pair("ignored")),
        ConverterRegistry::new(),
    );
    let model = mapper.model("Main").unwrap();
    assert!(
        mapper
            .resolve(model, StorageKind::RepeatedMessage, None)
            .is_custom()
    );
    assert!(!mapper.resolve(model, StorageKind::I32, Some("int32_field")).is_custom());
    assert!(mapper.resolve(model, StorageKind::DateTime, None).is_custom());
}

#[test]
fn per_field_converter_bypasses_relation_handling() {
    let mapper = mapper_with(
        ConverterRegistry::new().with_field(
            "fk",
            ConverterPair::new(
                |_cx, _message, _field, _value| Ok(()),
                |_cx, record, name, _field, _value| {
                    record.set(name, Value::Null)?;
                    Ok(())
                },
            ),
        ),
        ConverterRegistry::new(),
    );
    let mut relation = mapper.new_record("Relation").unwrap();
    relation.set("name", "r").unwrap();
    let mut main = mapper.new_record("Main").unwrap();
    main.set("fk", relation.clone()).unwrap();

    let message = mapper.to_message(&main).unwrap();
    assert!(!message.has_field_by_name("fk"));

    let mut incoming = message.clone();
    incoming.set_field_by_name("fk", ProtoValue::Message(mapper.to_message(&relation).unwrap()));
    let back = mapper.from_message("Main", &incoming).unwrap();
    assert_eq!(back.get("fk").unwrap(), &Value::Null);
}

#[test]
fn declared_record_field_kinds_drive_resolution() {
    let pool = models_pool();
    let mut registry = ModelRegistry::new();
    ModelDef::new("Main", desc(&pool, "Main"))
        .field(RecordField::new("string_field", StorageKind::Json))
        .build(&mut registry)
        .unwrap();
    let mapper = Mapper::new(registry);

    let mut message = DynamicMessage::new(desc(&pool, "Main"));
    message.set_field_by_name("string_field", ProtoValue::String("raw".to_string()));
    let back = mapper.from_message("Main", &message).unwrap();
    assert_eq!(
        back.get("string_field").unwrap(),
        &Value::Json(serde_json::json!("raw"))
    );
}
