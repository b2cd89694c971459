//! Axum router for the exposition listener.
//!
//! Only `GET /metrics`; other methods get 405, other paths 404.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use tonic::Code;

    use crate::config::PerfLabConfig;
    use crate::middleware::{GrpcType, MethodInfo};
    use crate::obs::MetricsRegistry;

    fn state() -> AppState {
        AppState::new(PerfLabConfig::default(), Arc::new(MetricsRegistry::new()))
    }

    async fn send(state: AppState, method: Method, uri: &str) -> (StatusCode, Option<String>, String) {
        let req = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let resp = build_router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let ctype = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, ctype, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn scrape_before_any_call_is_empty() {
        let (status, ctype, body) = send(state(), Method::GET, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ctype.as_deref(), Some("text/plain; version=0.0.4; charset=utf-8"));
        assert_eq!(body, "");
    }

    #[tokio::test]
    async fn scrape_reflects_recorded_calls() {
        let st = state();
        let say_hello = MethodInfo::new("helloworld.Greeter", "SayHello", GrpcType::Unary);
        st.instrumentation().record(&say_hello, Code::Ok, 0.002);

        let (_, _, body) = send(st.clone(), Method::GET, "/metrics").await;
        assert!(body.contains("grpc_server_requests_processed_total{method=\"SayHello\"} 1\n"));
        assert!(body.contains(
            "grpc_server_request_duration_seconds_bucket{method=\"SayHello\",le=\"0.001\"} 0\n"
        ));
        assert!(body.contains(
            "grpc_server_request_duration_seconds_bucket{method=\"SayHello\",le=\"0.005\"} 1\n"
        ));
        assert!(body.contains("grpc_server_request_duration_seconds_count{method=\"SayHello\"} 1\n"));
        assert!(body.contains(
            "grpc_server_handled_total{grpc_code=\"OK\",grpc_method=\"SayHello\",grpc_service=\"helloworld.Greeter\",grpc_type=\"unary\"} 1\n"
        ));
        assert!(body.contains(
            "grpc_server_handling_seconds_bucket{grpc_method=\"SayHello\",grpc_service=\"helloworld.Greeter\",grpc_type=\"unary\",le=\"0.005\"} 1\n"
        ));
        // Nothing was started through the layer.
        assert!(!body.contains("grpc_server_started_total"));

        let (_, _, again) = send(st, Method::GET, "/metrics").await;
        assert_eq!(body, again);
    }

    #[tokio::test]
    async fn only_get_metrics_is_served() {
        let (status, _, _) = send(state(), Method::POST, "/metrics").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _, _) = send(state(), Method::GET, "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
