//! Tower layer that instruments every gRPC request the server receives.
//!
//! The call starts when the request reaches the layer and ends when its
//! outcome is known: at once for a trailers-only response (`grpc-status`
//! in the headers), otherwise when the response body yields its trailers,
//! fails, ends, or is dropped. Streaming calls are therefore timed over the
//! whole stream, not just until the response headers.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http_body::{Body, Frame, SizeHint};
use tonic::codegen::http;
use tonic::Code;
use tower::{Layer, Service};

use super::instrument::{CallInstrumentation, InFlightCall};
use super::methods::MethodCatalog;

const GRPC_STATUS: &str = "grpc-status";

fn grpc_status(headers: &http::HeaderMap) -> Option<Code> {
    headers
        .get(GRPC_STATUS)
        .map(|v| Code::from_bytes(v.as_bytes()))
}

#[derive(Clone)]
pub struct GrpcMetricsLayer {
    instrumentation: CallInstrumentation,
    catalog: Arc<MethodCatalog>,
}

impl GrpcMetricsLayer {
    pub fn new(instrumentation: CallInstrumentation, catalog: Arc<MethodCatalog>) -> Self {
        Self {
            instrumentation,
            catalog,
        }
    }
}

impl<S> Layer<S> for GrpcMetricsLayer {
    type Service = GrpcMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GrpcMetricsService {
            inner,
            instrumentation: self.instrumentation.clone(),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

#[derive(Clone)]
pub struct GrpcMetricsService<S> {
    inner: S,
    instrumentation: CallInstrumentation,
    catalog: Arc<MethodCatalog>,
}

impl<S, B, ResBody> Service<http::Request<B>> for GrpcMetricsService<S>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>> + Clone,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = http::Response<InstrumentedBody<ResBody>>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        // Use the service that was driven ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let call = self
            .instrumentation
            .start(self.catalog.resolve(req.uri().path()));
        let fut = inner.call(req);

        Box::pin(async move {
            match fut.await {
                Ok(resp) => {
                    let (parts, body) = resp.into_parts();
                    let call = match grpc_status(&parts.headers) {
                        Some(code) => {
                            call.finish(code);
                            None
                        }
                        None => Some(call),
                    };
                    Ok(http::Response::from_parts(parts, InstrumentedBody::new(body, call)))
                }
                Err(e) => {
                    call.finish(Code::Unknown);
                    Err(e)
                }
            }
        })
    }
}

/// Response body that finishes its call once the outcome is known.
pub struct InstrumentedBody<B> {
    inner: Pin<Box<B>>,
    call: Option<InFlightCall>,
}

impl<B> InstrumentedBody<B> {
    fn new(inner: B, call: Option<InFlightCall>) -> Self {
        Self {
            inner: Box::pin(inner),
            call,
        }
    }

    fn finish(&mut self, code: Code) {
        if let Some(call) = self.call.take() {
            call.finish(code);
        }
    }
}

impl<B: Body> Body for InstrumentedBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = this.inner.as_mut().poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                // Trailers are the last frame; record before they go out.
                if let Some(trailers) = frame.trailers_ref() {
                    this.finish(grpc_status(trailers).unwrap_or(Code::Unknown));
                }
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => this.finish(Code::Unknown),
            Poll::Pending => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for InstrumentedBody<B> {
    fn drop(&mut self) {
        self.finish(Code::Cancelled);
    }
}
