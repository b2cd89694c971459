//! gRPC transport: service glue, reflection, and the catalog of served methods.

pub mod greeter;
pub mod reflection;

use perflab_core::protocol::descriptor;

use crate::middleware::MethodCatalog;

pub use greeter::{Greeter, GreeterClient, GreeterServer};
pub use reflection::with_reflection;

/// Every method the server routes: the helloworld descriptor plus reflection.
pub fn method_catalog() -> MethodCatalog {
    let mut catalog = MethodCatalog::new().with_descriptor_set(&descriptor::file_descriptor_set());
    catalog.insert(reflection::reflection_method());
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_greeter_and_reflection() {
        let cat = method_catalog();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.resolve("/helloworld.Greeter/SayHello").method, "SayHello");
        assert_eq!(
            cat.resolve("/grpc.reflection.v1.ServerReflection/ServerReflectionInfo")
                .grpc_type
                .as_str(),
            "bidi_stream"
        );
        assert_eq!(cat.resolve("/helloworld.Greeter/Nope").method, "unknown");
    }
}
