//! Known gRPC methods, keyed by request path.
//!
//! Labels come from this catalog only. A path that no registered service
//! serves resolves to one shared `unknown` entry, so clients cannot mint
//! new series by inventing paths.

use std::collections::HashMap;
use std::sync::Arc;

use prost_types::FileDescriptorSet;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrpcType {
    Unary,
    ClientStream,
    ServerStream,
    BidiStream,
    Unknown,
}

impl GrpcType {
    pub fn from_streaming(client_streaming: bool, server_streaming: bool) -> Self {
        match (client_streaming, server_streaming) {
            (false, false) => GrpcType::Unary,
            (true, false) => GrpcType::ClientStream,
            (false, true) => GrpcType::ServerStream,
            (true, true) => GrpcType::BidiStream,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GrpcType::Unary => "unary",
            GrpcType::ClientStream => "client_stream",
            GrpcType::ServerStream => "server_stream",
            GrpcType::BidiStream => "bidi_stream",
            GrpcType::Unknown => UNKNOWN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Fully qualified service, e.g. `helloworld.Greeter`.
    pub service: String,
    /// Bare method name, e.g. `SayHello`.
    pub method: String,
    pub grpc_type: GrpcType,
}

impl MethodInfo {
    pub fn new(service: &str, method: &str, grpc_type: GrpcType) -> Self {
        Self {
            service: service.to_string(),
            method: method.to_string(),
            grpc_type,
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN, GrpcType::Unknown)
    }

    /// HTTP/2 request path, `/<service>/<method>`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

#[derive(Debug, Clone)]
pub struct MethodCatalog {
    by_path: HashMap<String, Arc<MethodInfo>>,
    unknown: Arc<MethodInfo>,
}

impl Default for MethodCatalog {
    fn default() -> Self {
        Self {
            by_path: HashMap::new(),
            unknown: Arc::new(MethodInfo::unknown()),
        }
    }
}

impl MethodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: MethodInfo) {
        self.by_path.insert(info.path(), Arc::new(info));
    }

    /// Add every method of every service in `set`.
    pub fn with_descriptor_set(mut self, set: &FileDescriptorSet) -> Self {
        for file in &set.file {
            for svc in &file.service {
                let service = match file.package() {
                    "" => svc.name().to_string(),
                    pkg => format!("{pkg}.{}", svc.name()),
                };
                for m in &svc.method {
                    let grpc_type =
                        GrpcType::from_streaming(m.client_streaming(), m.server_streaming());
                    self.insert(MethodInfo::new(&service, m.name(), grpc_type));
                }
            }
        }
        self
    }

    /// Entry for a request path; anything unregistered maps to `unknown`.
    pub fn resolve(&self, path: &str) -> Arc<MethodInfo> {
        self.by_path
            .get(path)
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::clone(&self.unknown))
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perflab_core::protocol::descriptor;

    #[test]
    fn descriptor_methods_are_known() {
        let cat = MethodCatalog::new().with_descriptor_set(&descriptor::file_descriptor_set());
        assert_eq!(cat.len(), 1);

        let info = cat.resolve("/helloworld.Greeter/SayHello");
        assert_eq!(info.service, "helloworld.Greeter");
        assert_eq!(info.method, "SayHello");
        assert_eq!(info.grpc_type, GrpcType::Unary);
    }

    #[test]
    fn unregistered_paths_share_the_unknown_entry() {
        let cat = MethodCatalog::new().with_descriptor_set(&descriptor::file_descriptor_set());
        let a = cat.resolve("/no.Such/Bogus1");
        let b = cat.resolve("/helloworld.Greeter/Nope");
        let c = cat.resolve("");
        assert_eq!(*a, MethodInfo::unknown());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[test]
    fn streaming_flags_map_to_types() {
        assert_eq!(GrpcType::from_streaming(true, true).as_str(), "bidi_stream");
        assert_eq!(GrpcType::from_streaming(false, true).as_str(), "server_stream");
        assert_eq!(GrpcType::from_streaming(true, false).as_str(), "client_stream");
        assert_eq!(GrpcType::Unknown.as_str(), "unknown");
    }
}
