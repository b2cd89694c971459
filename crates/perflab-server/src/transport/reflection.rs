//! gRPC server reflection (`grpc.reflection.v1.ServerReflection`).
//!
//! Lets generic tooling (grpcurl, load generators) discover `SayHello`
//! without a local copy of the proto. Reflection requests go through the
//! same metrics layer as any other method.

use tonic::transport::server::Router;

use perflab_core::error::{PerfLabError, Result};
use perflab_core::protocol::descriptor;

use crate::middleware::{GrpcType, MethodInfo};

pub const REFLECTION_SERVICE: &str = "grpc.reflection.v1.ServerReflection";
pub const REFLECTION_METHOD: &str = "ServerReflectionInfo";

/// The single (bidirectional streaming) reflection method.
pub fn reflection_method() -> MethodInfo {
    MethodInfo::new(REFLECTION_SERVICE, REFLECTION_METHOD, GrpcType::BidiStream)
}

/// Add the reflection service, fed by the in-code helloworld descriptor.
pub fn with_reflection<L>(router: Router<L>) -> Result<Router<L>> {
    let svc = tonic_reflection::server::Builder::configure()
        .register_file_descriptor_set(descriptor::file_descriptor_set())
        .build_v1()
        .map_err(|e| PerfLabError::Internal(format!("reflection service build failed: {e}")))?;
    Ok(router.add_service(svc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::GreeterService;
    use crate::transport::GreeterServer;

    #[test]
    fn builds_from_in_code_descriptor() {
        let router = tonic::transport::Server::builder()
            .add_service(GreeterServer::new(GreeterService::new()));
        assert!(with_reflection(router).is_ok());
    }

    #[test]
    fn reflection_path_is_the_v1_stream() {
        let info = reflection_method();
        assert_eq!(info.path(), "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo");
        assert_eq!(info.grpc_type.as_str(), "bidi_stream");
    }
}
