//! `helloworld.Greeter` service glue for tonic (server and client).
//!
//! Written by hand against `tonic::server::Grpc` / `tonic::client::Grpc`
//! instead of generated from the proto, so the build needs no `protoc`.

use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tonic::codec::ProstCodec;
use tonic::codegen::{http, Body, BoxFuture, Service, StdError};
use tonic::transport::{Channel, Endpoint};
use tonic::{IntoRequest, Request, Response, Status};

use perflab_core::protocol::{HelloReply, HelloRequest, GREETER_SERVICE, SAY_HELLO_PATH};

/// Server-side contract of `helloworld.Greeter`.
#[async_trait]
pub trait Greeter: Send + Sync + 'static {
    async fn say_hello(&self, request: Request<HelloRequest>)
        -> Result<Response<HelloReply>, Status>;
}

/// Routes `helloworld.Greeter` requests to a [`Greeter`] implementation.
#[derive(Debug)]
pub struct GreeterServer<T> {
    inner: Arc<T>,
}

impl<T: Greeter> GreeterServer<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl<T> Clone for GreeterServer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Greeter> tonic::server::NamedService for GreeterServer<T> {
    const NAME: &'static str = GREETER_SERVICE;
}

struct SayHelloSvc<T>(Arc<T>);

impl<T: Greeter> tonic::server::UnaryService<HelloRequest> for SayHelloSvc<T> {
    type Response = HelloReply;
    type Future = BoxFuture<Response<HelloReply>, Status>;

    fn call(&mut self, request: Request<HelloRequest>) -> Self::Future {
        let inner = Arc::clone(&self.0);
        Box::pin(async move { inner.say_hello(request).await })
    }
}

impl<T, B> Service<http::Request<B>> for GreeterServer<T>
where
    T: Greeter,
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        match req.uri().path() {
            SAY_HELLO_PATH => {
                let inner = Arc::clone(&self.inner);
                Box::pin(async move {
                    let mut grpc = tonic::server::Grpc::new(ProstCodec::default());
                    Ok(grpc.unary(SayHelloSvc(inner), req).await)
                })
            }
            _ => Box::pin(async move { Ok(unimplemented_response()) }),
        }
    }
}

/// `grpc-status: 12` with an empty body, as stock gRPC servers answer
/// unknown methods on a known service.
fn unimplemented_response() -> http::Response<tonic::body::BoxBody> {
    let mut response = http::Response::new(tonic::body::empty_body());
    let headers = response.headers_mut();
    headers.insert(
        http::HeaderName::from_static("grpc-status"),
        http::HeaderValue::from(tonic::Code::Unimplemented as i32),
    );
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/grpc"),
    );
    response
}

/// Minimal `helloworld.Greeter` client, used by load tooling and tests.
#[derive(Debug, Clone)]
pub struct GreeterClient {
    inner: tonic::client::Grpc<Channel>,
}

impl GreeterClient {
    /// Connect to `dst` (e.g. `http://127.0.0.1:50051`).
    pub async fn connect(dst: String) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(dst)?.connect().await?;
        Ok(Self::new(channel))
    }

    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn say_hello(
        &mut self,
        request: impl IntoRequest<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unknown(format!("service was not ready: {e}")))?;
        let path = http::uri::PathAndQuery::from_static(SAY_HELLO_PATH);
        self.inner
            .unary(request.into_request(), path, ProstCodec::default())
            .await
    }
}
