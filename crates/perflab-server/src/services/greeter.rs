use async_trait::async_trait;
use tonic::{Request, Response, Status};

use perflab_core::protocol::{HelloReply, HelloRequest};

use crate::transport::Greeter;

/// `"Hello " + name`. Empty names are fine.
pub fn greeting(name: &str) -> String {
    let mut out = String::with_capacity(6 + name.len());
    out.push_str("Hello ");
    out.push_str(name);
    out
}

/// Stateless `SayHello` handler. Never fails and records no metrics;
/// instrumentation happens in the transport layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreeterService;

impl GreeterService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Greeter for GreeterService {
    async fn say_hello(
        &self,
        request: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        let req = request.into_inner();
        Ok(Response::new(HelloReply {
            message: greeting(&req.name),
        }))
    }
}
