//! helloworld protocol (gRPC `helloworld.Greeter`).
//!
//! Messages are plain `prost` structs matching the canonical helloworld
//! proto, so any stock gRPC client can talk to the server:
//!
//! ```text
//! service Greeter { rpc SayHello (HelloRequest) returns (HelloReply) {} }
//! message HelloRequest { string name = 1; }
//! message HelloReply { string message = 1; }
//! ```
//!
//! The matching file descriptor lives in [`descriptor`] and feeds server
//! reflection.

pub mod descriptor;
pub mod hello;

pub use hello::{HelloReply, HelloRequest};

/// Protobuf package name.
pub const PACKAGE: &str = "helloworld";

/// Fully qualified service name.
pub const GREETER_SERVICE: &str = "helloworld.Greeter";

/// Method name of the single unary RPC.
pub const SAY_HELLO: &str = "SayHello";

/// HTTP/2 path of `SayHello`.
pub const SAY_HELLO_PATH: &str = "/helloworld.Greeter/SayHello";
