//! In-code `FileDescriptorSet` for `helloworld.proto`.
//!
//! Built from `prost-types` rather than a `protoc` run so the workspace has
//! no build-time toolchain requirement. Must stay in sync with
//! [`super::hello`].

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};

use super::{PACKAGE, SAY_HELLO};

/// File name the descriptor is registered under.
pub const FILE_NAME: &str = "helloworld.proto";

/// Descriptor set describing the Greeter service and its messages.
pub fn file_descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![file_descriptor()],
    }
}

fn file_descriptor() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(FILE_NAME.into()),
        package: Some(PACKAGE.into()),
        message_type: vec![
            single_string_message("HelloRequest", "name"),
            single_string_message("HelloReply", "message"),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("Greeter".into()),
            method: vec![MethodDescriptorProto {
                name: Some(SAY_HELLO.into()),
                input_type: Some(format!(".{PACKAGE}.HelloRequest")),
                output_type: Some(format!(".{PACKAGE}.HelloReply")),
                ..Default::default()
            }],
            ..Default::default()
        }],
        syntax: Some("proto3".into()),
        ..Default::default()
    }
}

fn single_string_message(name: &str, field: &str) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.into()),
        field: vec![FieldDescriptorProto {
            name: Some(field.into()),
            number: Some(1),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::String as i32),
            json_name: Some(field.into()),
            ..Default::default()
        }],
        ..Default::default()
    }
}
