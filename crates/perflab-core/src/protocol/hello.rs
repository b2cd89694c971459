//! helloworld wire messages.

/// Request carrying the name to greet (may be empty).
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct HelloRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}

/// Reply carrying the greeting.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct HelloReply {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
}

impl HelloRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
