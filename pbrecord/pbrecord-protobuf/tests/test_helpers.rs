//! Shared helpers for building protobuf descriptors in tests.

use prost::Message;
use prost_reflect::{DescriptorPool, MessageDescriptor};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions,
    field_descriptor_proto::{Label, Type},
};

pub const TIMESTAMP_FILE: &str = "google/protobuf/timestamp.proto";
pub const TIMESTAMP_TYPE: &str = ".google.protobuf.Timestamp";

/// The well-known `Timestamp` message, declared by hand so pools built here
/// do not depend on a global registry.
fn timestamp_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(TIMESTAMP_FILE.to_string()),
        package: Some("google.protobuf".to_string()),
        message_type: vec![message(
            "Timestamp",
            vec![
                scalar_field("seconds", 1, Type::Int64),
                scalar_field("nanos", 2, Type::Int32),
            ],
        )],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// Build a `FileDescriptorSet` holding one file with the given messages
/// (plus the `Timestamp` file it may depend on) and serialize it.
pub fn build_fds(file_name: &str, messages: Vec<DescriptorProto>) -> Vec<u8> {
    build_fds_with_enums(file_name, messages, vec![])
}

/// Build a `FileDescriptorSet` with messages and top-level enums.
pub fn build_fds_with_enums(
    file_name: &str,
    messages: Vec<DescriptorProto>,
    enums: Vec<EnumDescriptorProto>,
) -> Vec<u8> {
    let fds = FileDescriptorSet {
        file: vec![
            timestamp_file(),
            FileDescriptorProto {
                name: Some(file_name.to_string()),
                dependency: vec![TIMESTAMP_FILE.to_string()],
                message_type: messages,
                enum_type: enums,
                syntax: Some("proto3".to_string()),
                ..Default::default()
            },
        ],
    };
    fds.encode_to_vec()
}

/// Decode FDS bytes into a pool.
pub fn pool(fds: &[u8]) -> DescriptorPool {
    DescriptorPool::decode(fds).unwrap()
}

pub fn desc(pool: &DescriptorPool, name: &str) -> MessageDescriptor {
    pool.get_message_by_name(name).unwrap()
}

/// A message with the given fields.
pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

/// A message with the given fields and nested (map entry) types.
pub fn message_with_nested(
    name: &str,
    fields: Vec<FieldDescriptorProto>,
    nested: Vec<DescriptorProto>,
) -> DescriptorProto {
    DescriptorProto {
        nested_type: nested,
        ..message(name, fields)
    }
}

/// Create a scalar field descriptor.
pub fn scalar_field(name: &str, number: i32, typ: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(typ.into()),
        label: Some(Label::Optional.into()),
        ..Default::default()
    }
}

/// Create a repeated (list) field descriptor.
pub fn repeated_field(name: &str, number: i32, typ: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated.into()),
        ..scalar_field(name, number, typ)
    }
}

/// Create a message-typed field descriptor.
pub fn message_field(
    name: &str,
    number: i32,
    type_name: &str,
    label: Label,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(Type::Message.into()),
        type_name: Some(type_name.to_string()),
        label: Some(label.into()),
        ..Default::default()
    }
}

/// Create an enum-typed field descriptor.
pub fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(Type::Enum.into()),
        type_name: Some(type_name.to_string()),
        label: Some(Label::Optional.into()),
        ..Default::default()
    }
}

/// Create a simple enum descriptor.
pub fn simple_enum(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .map(|(n, num)| EnumValueDescriptorProto {
                name: Some(n.to_string()),
                number: Some(*num),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// Create a map entry message with a scalar value.
pub fn map_entry_message(name: &str, key_type: Type, value_type: Type) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: vec![
            scalar_field("key", 1, key_type),
            scalar_field("value", 2, value_type),
        ],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Create a map entry message whose value is the message `value_type_name`.
pub fn message_map_entry(name: &str, key_type: Type, value_type_name: &str) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: vec![
            scalar_field("key", 1, key_type),
            message_field("value", 2, value_type_name, Label::Optional),
        ],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Schema shared by the model and mapper tests:
///
/// - `Relation`: `id`, `name`.
/// - `Main`: every scalar type, an enum, a timestamp, a single `Relation`
///   (`fk`), repeated `Relation`s (`m2m`), a repeated scalar, a scalar map
///   and a UUID-as-string field.
/// - `Item` / `Collection`: repeated and keyed `Item`s.
/// - `Node`: self-referential chain.
/// - `Parent`: repeated `Relation`s mapped as a reverse relation.
/// - `Envelope` / `Header` / `Stamp`: nested messages flattened by remaps.
pub fn models_fds() -> Vec<u8> {
    let relation = message(
        "Relation",
        vec![
            scalar_field("id", 1, Type::Int32),
            scalar_field("name", 2, Type::String),
        ],
    );
    let main = message_with_nested(
        "Main",
        vec![
            scalar_field("id", 1, Type::Int32),
            scalar_field("double_field", 2, Type::Double),
            scalar_field("float_field", 3, Type::Float),
            scalar_field("int32_field", 4, Type::Int32),
            scalar_field("int64_field", 5, Type::Int64),
            scalar_field("uint32_field", 6, Type::Uint32),
            scalar_field("uint64_field", 7, Type::Uint64),
            scalar_field("bool_field", 8, Type::Bool),
            scalar_field("string_field", 9, Type::String),
            scalar_field("bytes_field", 10, Type::Bytes),
            enum_field("enum_field", 11, ".Color"),
            message_field("timestamp_field", 12, TIMESTAMP_TYPE, Label::Optional),
            message_field("fk", 13, ".Relation", Label::Optional),
            message_field("m2m", 14, ".Relation", Label::Repeated),
            repeated_field("numbers", 15, Type::Int32),
            message_field("labels", 16, ".Main.LabelsEntry", Label::Repeated),
            scalar_field("uuid_field", 17, Type::String),
        ],
        vec![map_entry_message("LabelsEntry", Type::String, Type::Int32)],
    );
    let item = message(
        "Item",
        vec![
            scalar_field("id", 1, Type::Int32),
            scalar_field("label", 2, Type::String),
        ],
    );
    let collection = message_with_nested(
        "Collection",
        vec![
            scalar_field("id", 1, Type::Int32),
            scalar_field("title", 2, Type::String),
            message_field("items", 3, ".Item", Label::Repeated),
            message_field("slots", 4, ".Collection.SlotsEntry", Label::Repeated),
        ],
        vec![message_map_entry("SlotsEntry", Type::String, ".Item")],
    );
    let node = message(
        "Node",
        vec![
            scalar_field("id", 1, Type::Int32),
            scalar_field("name", 2, Type::String),
            message_field("child", 3, ".Node", Label::Optional),
        ],
    );
    let parent = message(
        "Parent",
        vec![
            scalar_field("id", 1, Type::Int32),
            scalar_field("name", 2, Type::String),
            message_field("children", 3, ".Relation", Label::Repeated),
        ],
    );
    let stamp = message("Stamp", vec![scalar_field("author", 1, Type::String)]);
    let header = message(
        "Header",
        vec![
            scalar_field("title", 1, Type::String),
            message_field("stamp", 2, ".Stamp", Label::Optional),
        ],
    );
    let envelope = message(
        "Envelope",
        vec![
            scalar_field("id", 1, Type::Int32),
            message_field("header", 2, ".Header", Label::Optional),
            scalar_field("body", 3, Type::String),
        ],
    );
    build_fds_with_enums(
        "models.proto",
        vec![
            relation, main, item, collection, node, parent, stamp, header, envelope,
        ],
        vec![simple_enum("Color", &[("RED", 0), ("GREEN", 1), ("BLUE", 2)])],
    )
}

/// Pool holding [`models_fds`].
pub fn models_pool() -> DescriptorPool {
    pool(&models_fds())
}
