use std::sync::Arc;
use std::time::Instant;

use tonic::Code;

use super::methods::MethodInfo;
use crate::obs::{MetricsRegistry, LATENCY_BUCKETS};

/// Counter family: calls per method.
pub const REQUESTS_PROCESSED: &str = "grpc_server_requests_processed_total";
/// Histogram family: call latency per method, in seconds.
pub const REQUEST_DURATION: &str = "grpc_server_request_duration_seconds";

/// Counter family: calls started, by type/service/method.
pub const STARTED: &str = "grpc_server_started_total";
/// Counter family: calls completed, additionally by status code.
pub const HANDLED: &str = "grpc_server_handled_total";
/// Histogram family: time until the call completed.
pub const HANDLING_SECONDS: &str = "grpc_server_handling_seconds";

/// Bounds of [`HANDLING_SECONDS`] (the Prometheus client default buckets).
pub const HANDLING_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

const METHOD_LABEL: &str = "method";

/// Status code label value, spelled like the Go gRPC code names.
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "Canceled",
        Code::Unknown => "Unknown",
        Code::InvalidArgument => "InvalidArgument",
        Code::DeadlineExceeded => "DeadlineExceeded",
        Code::NotFound => "NotFound",
        Code::AlreadyExists => "AlreadyExists",
        Code::PermissionDenied => "PermissionDenied",
        Code::ResourceExhausted => "ResourceExhausted",
        Code::FailedPrecondition => "FailedPrecondition",
        Code::Aborted => "Aborted",
        Code::OutOfRange => "OutOfRange",
        Code::Unimplemented => "Unimplemented",
        Code::Internal => "Internal",
        Code::Unavailable => "Unavailable",
        Code::DataLoss => "DataLoss",
        Code::Unauthenticated => "Unauthenticated",
    }
}

/// Records started and finished calls into the registry.
///
/// Holds nothing but the registry handle; cloning is cheap.
#[derive(Clone)]
pub struct CallInstrumentation {
    registry: Arc<MetricsRegistry>,
}

impl CallInstrumentation {
    /// Registers every family (help text, fixed buckets) up front.
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        registry.register_counter(REQUESTS_PROCESSED, "The total number of processed gRPC requests");
        registry.register_histogram(REQUEST_DURATION, "Request duration in seconds", &LATENCY_BUCKETS);
        registry.register_counter(STARTED, "Total number of RPCs started on the server.");
        registry.register_counter(
            HANDLED,
            "Total number of RPCs completed on the server, regardless of success or failure.",
        );
        registry.register_histogram(
            HANDLING_SECONDS,
            "Histogram of response latency (seconds) of gRPC that had been application-level handled by the server.",
            &HANDLING_BUCKETS,
        );
        Self { registry }
    }

    /// Count a started call and begin timing it.
    pub fn start(&self, info: Arc<MethodInfo>) -> InFlightCall {
        self.registry.counter(STARTED, &call_labels(&info)).inc();
        InFlightCall {
            instrumentation: self.clone(),
            info,
            started: Instant::now(),
            done: false,
        }
    }

    /// Record one finished call that took `seconds` and ended with `code`.
    pub fn record(&self, info: &MethodInfo, code: Code, seconds: f64) {
        let method = [(METHOD_LABEL, info.method.as_str())];
        self.registry.counter(REQUESTS_PROCESSED, &method).inc();
        self.registry.histogram(REQUEST_DURATION, &method).observe(seconds);

        let labels = call_labels(info);
        let mut handled = labels.to_vec();
        handled.push(("grpc_code", code_name(code)));
        self.registry.counter(HANDLED, &handled).inc();
        self.registry.histogram(HANDLING_SECONDS, &labels).observe(seconds);

        tracing::trace!(
            service = %info.service,
            method = %info.method,
            code = code_name(code),
            elapsed = seconds,
            "call recorded"
        );
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }
}

fn call_labels(info: &MethodInfo) -> [(&'static str, &str); 3] {
    [
        ("grpc_type", info.grpc_type.as_str()),
        ("grpc_service", info.service.as_str()),
        ("grpc_method", info.method.as_str()),
    ]
}

/// A started call. Recorded exactly once: by [`InFlightCall::finish`], or
/// as `Canceled` if dropped first.
pub struct InFlightCall {
    instrumentation: CallInstrumentation,
    info: Arc<MethodInfo>,
    started: Instant,
    done: bool,
}

impl InFlightCall {
    pub fn method(&self) -> &MethodInfo {
        &self.info
    }

    pub fn finish(mut self, code: Code) {
        self.complete(code);
    }

    fn complete(&mut self, code: Code) {
        if self.done {
            return;
        }
        self.done = true;
        let elapsed = self.started.elapsed().as_secs_f64();
        self.instrumentation.record(&self.info, code, elapsed);
    }
}

impl Drop for InFlightCall {
    fn drop(&mut self) {
        self.complete(Code::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::methods::GrpcType;
    use std::time::Duration;

    fn say_hello() -> Arc<MethodInfo> {
        Arc::new(MethodInfo::new("helloworld.Greeter", "SayHello", GrpcType::Unary))
    }

    fn handled(code: &'static str) -> [(&'static str, &'static str); 4] {
        [
            ("grpc_type", "unary"),
            ("grpc_service", "helloworld.Greeter"),
            ("grpc_method", "SayHello"),
            ("grpc_code", code),
        ]
    }

    const CALL: [(&str, &str); 3] = [
        ("grpc_type", "unary"),
        ("grpc_service", "helloworld.Greeter"),
        ("grpc_method", "SayHello"),
    ];

    #[test]
    fn start_counts_before_finish() {
        let instr = CallInstrumentation::new(Arc::new(MetricsRegistry::new()));
        let call = instr.start(say_hello());
        assert_eq!(call.method().method, "SayHello");

        let snap = instr.registry().snapshot();
        assert_eq!(snap.counter_value(STARTED, &CALL), Some(1));
        assert_eq!(snap.counter_value(REQUESTS_PROCESSED, &[("method", "SayHello")]), None);

        call.finish(Code::Ok);
        let snap = instr.registry().snapshot();
        assert_eq!(snap.counter_value(REQUESTS_PROCESSED, &[("method", "SayHello")]), Some(1));
        assert_eq!(snap.counter_value(HANDLED, &handled("OK")), Some(1));
        assert_eq!(snap.histogram_sample(HANDLING_SECONDS, &CALL).unwrap().count, 1);
        assert_eq!(
            snap.histogram_sample(REQUEST_DURATION, &[("method", "SayHello")]).unwrap().count,
            1
        );
    }

    #[test]
    fn failures_are_recorded_with_their_code() {
        let instr = CallInstrumentation::new(Arc::new(MetricsRegistry::new()));
        instr.start(say_hello()).finish(Code::Unavailable);

        let snap = instr.registry().snapshot();
        assert_eq!(snap.counter_value(HANDLED, &handled("Unavailable")), Some(1));
        assert_eq!(snap.counter_value(REQUESTS_PROCESSED, &[("method", "SayHello")]), Some(1));
    }

    #[test]
    fn dropped_call_is_canceled_once() {
        let instr = CallInstrumentation::new(Arc::new(MetricsRegistry::new()));
        drop(instr.start(say_hello()));

        let snap = instr.registry().snapshot();
        assert_eq!(snap.counter_value(HANDLED, &handled("Canceled")), Some(1));
        assert_eq!(snap.counter_value(HANDLED, &handled("OK")), None);
        assert_eq!(snap.counter_value(REQUESTS_PROCESSED, &[("method", "SayHello")]), Some(1));
    }

    #[tokio::test]
    async fn duration_covers_the_call() {
        let instr = CallInstrumentation::new(Arc::new(MetricsRegistry::new()));
        let call = instr.start(say_hello());
        tokio::time::sleep(Duration::from_millis(30)).await;
        call.finish(Code::Ok);

        let snap = instr.registry().snapshot();
        let h = snap.histogram_sample(REQUEST_DURATION, &[("method", "SayHello")]).unwrap();
        assert!(h.sum >= 0.03, "sum={}", h.sum);
        // le=0.025 must not hold a 30ms call.
        assert_eq!(h.cumulative[3], 0);
        let h = snap.histogram_sample(HANDLING_SECONDS, &CALL).unwrap();
        assert_eq!(h.cumulative[2], 0);
        assert_eq!(h.count, 1);
    }

    #[test]
    fn methods_are_labeled_separately() {
        let instr = CallInstrumentation::new(Arc::new(MetricsRegistry::new()));
        let a = Arc::new(MethodInfo::new("pkg.S", "A", GrpcType::Unary));
        let b = Arc::new(MethodInfo::new("pkg.S", "B", GrpcType::ServerStream));
        for m in [&a, &b, &a] {
            instr.start(Arc::clone(m)).finish(Code::Ok);
        }
        let snap = instr.registry().snapshot();
        assert_eq!(snap.counter_value(REQUESTS_PROCESSED, &[("method", "A")]), Some(2));
        assert_eq!(snap.counter_value(REQUESTS_PROCESSED, &[("method", "B")]), Some(1));
        assert_eq!(
            snap.counter_value(
                STARTED,
                &[("grpc_type", "server_stream"), ("grpc_service", "pkg.S"), ("grpc_method", "B")]
            ),
            Some(1)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_are_all_recorded() {
        let instr = CallInstrumentation::new(Arc::new(MetricsRegistry::new()));
        let info = say_hello();
        let mut tasks = Vec::new();
        for _ in 0..200 {
            let instr = instr.clone();
            let info = Arc::clone(&info);
            tasks.push(tokio::spawn(async move {
                let call = instr.start(info);
                tokio::task::yield_now().await;
                call.finish(Code::Ok);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        let snap = instr.registry().snapshot();
        assert_eq!(snap.counter_value(REQUESTS_PROCESSED, &[("method", "SayHello")]), Some(200));
        assert_eq!(snap.counter_value(STARTED, &CALL), Some(200));
        assert_eq!(snap.counter_value(HANDLED, &handled("OK")), Some(200));
        let h = snap.histogram_sample(REQUEST_DURATION, &[("method", "SayHello")]).unwrap();
        assert_eq!(h.count, 200);
    }
}
