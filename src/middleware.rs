//! Request instrumentation middleware.
//!
//! Wraps every inbound request: captures method, path, and the matched
//! route template on entry, then records the request counters and latency
//! histogram and emits one structured log line when the response
//! finalizes. Recording is driven by a drop guard so it runs exactly once
//! on every exit path, including cancellation when the client disconnects
//! before the handler completes.
//!
//! Registry failures are contained here: they are logged and the
//! observation is dropped, never surfaced to the client.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app_state::AppState;
use crate::domain::{MetricDefinition, MetricError};
use crate::infrastructure::metrics::MetricRegistry;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const HTTP_ERRORS_TOTAL: &str = "http_errors_total";

/// Latency bucket boundaries in seconds.
pub const DURATION_BUCKETS: [f64; 5] = [0.1, 0.5, 1.0, 2.0, 5.0];

/// Route label used when no route matched the request path. Raw paths are
/// never used as label values: a path scan would otherwise mint one time
/// series per probed URL.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Status label recorded when the request future is cancelled before a
/// response exists (client closed the connection).
const STATUS_CLIENT_CLOSED: u16 = 499;

/// Registers the HTTP request metrics on `registry`. Called once at
/// startup; a duplicate-shape failure here is fatal.
pub fn register_request_metrics(registry: &MetricRegistry) -> Result<(), MetricError> {
    registry.register(MetricDefinition::counter(
        HTTP_REQUESTS_TOTAL,
        "Total HTTP requests",
        &["method", "route", "status"],
    ))?;
    registry.register(MetricDefinition::histogram(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request latency in seconds",
        &["method", "route", "status"],
        &DURATION_BUCKETS,
    ))?;
    registry.register(MetricDefinition::counter(
        HTTP_ERRORS_TOTAL,
        "Total HTTP errors",
        &["method", "route", "status"],
    ))?;
    Ok(())
}

/// Middleware wrapping every request/response cycle.
///
/// Installed via `axum::middleware::from_fn_with_state` on the whole
/// router, fallback included, so 404s are observed too.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_owned();
    let path = request.uri().path().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned());

    let mut timer = RequestTimer::start(Arc::clone(state.registry()), method, path, route);
    let response = next.run(request).await;
    timer.finalize(response.status().as_u16());
    response
}

/// Scoped per-request recording context.
///
/// The actual recording happens in `Drop`, which is the one place every
/// exit path funnels through: normal completion and error responses call
/// [`finalize`](Self::finalize) first, while cancellation (the request
/// future dropped mid-flight) reaches `Drop` directly and records with a
/// 499 status label.
struct RequestTimer {
    registry: Arc<MetricRegistry>,
    method: String,
    path: String,
    route: Option<String>,
    start: Instant,
    status: Option<u16>,
}

impl RequestTimer {
    fn start(
        registry: Arc<MetricRegistry>,
        method: String,
        path: String,
        route: Option<String>,
    ) -> Self {
        RequestTimer {
            registry,
            method,
            path,
            route,
            start: Instant::now(),
            status: None,
        }
    }

    /// Marks the response as finalized with its status code.
    fn finalize(&mut self, status: u16) {
        self.status = Some(status);
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let status = self.status.unwrap_or(STATUS_CLIENT_CLOSED);
        let duration = self.start.elapsed().as_secs_f64();
        let route = self.route.as_deref().unwrap_or(UNMATCHED_ROUTE);
        let status_label = status.to_string();
        let labels = [
            ("method", self.method.as_str()),
            ("route", route),
            ("status", status_label.as_str()),
        ];

        observe_or_log(&self.registry, HTTP_REQUESTS_TOTAL, &labels, 1.0);
        observe_or_log(&self.registry, HTTP_REQUEST_DURATION_SECONDS, &labels, duration);
        if status >= 400 {
            observe_or_log(&self.registry, HTTP_ERRORS_TOTAL, &labels, 1.0);
        }

        tracing::info!(
            method = %self.method,
            url = %self.path,
            status,
            duration,
            "request completed"
        );
    }
}

fn observe_or_log(registry: &MetricRegistry, name: &str, labels: &[(&str, &str)], value: f64) {
    if let Err(err) = registry.observe(name, labels, value) {
        tracing::error!(metric = name, error = %err, "failed to record request metric");
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::domain::SampleValue;

    fn registry() -> Arc<MetricRegistry> {
        let registry = Arc::new(MetricRegistry::new());
        register_request_metrics(&registry).unwrap();
        registry
    }

    fn counter_value(
        registry: &MetricRegistry,
        name: &str,
        method: &str,
        route: &str,
        status: &str,
    ) -> Option<f64> {
        let snapshot = registry.snapshot();
        let metric = snapshot
            .metrics
            .iter()
            .find(|m| m.definition.name == name)?;
        let key = vec![method.to_owned(), route.to_owned(), status.to_owned()];
        match &metric.samples.iter().find(|(k, _)| *k == key)?.1 {
            SampleValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    #[test]
    fn registration_is_idempotent() {
        let registry = registry();
        register_request_metrics(&registry).unwrap();
    }

    #[test]
    fn finalized_timer_records_request_and_duration() {
        let registry = registry();
        let mut timer = RequestTimer::start(
            Arc::clone(&registry),
            "GET".into(),
            "/health".into(),
            Some("/health".into()),
        );
        timer.finalize(200);
        drop(timer);

        assert_eq!(
            counter_value(&registry, HTTP_REQUESTS_TOTAL, "GET", "/health", "200"),
            Some(1.0)
        );
        // 200s never touch the error counter
        assert_eq!(
            counter_value(&registry, HTTP_ERRORS_TOTAL, "GET", "/health", "200"),
            None
        );

        let snapshot = registry.snapshot();
        let hist = snapshot
            .metrics
            .iter()
            .find(|m| m.definition.name == HTTP_REQUEST_DURATION_SECONDS)
            .unwrap();
        match &hist.samples[0].1 {
            SampleValue::Histogram(h) => assert_eq!(h.count, 1),
            other => panic!("unexpected sample: {other:?}"),
        }
    }

    #[test]
    fn error_statuses_increment_error_counter_once() {
        let registry = registry();
        let mut timer = RequestTimer::start(
            Arc::clone(&registry),
            "GET".into(),
            "/nonexistent".into(),
            None,
        );
        timer.finalize(404);
        drop(timer);

        assert_eq!(
            counter_value(&registry, HTTP_ERRORS_TOTAL, "GET", UNMATCHED_ROUTE, "404"),
            Some(1.0)
        );
        assert_eq!(
            counter_value(&registry, HTTP_REQUESTS_TOTAL, "GET", UNMATCHED_ROUTE, "404"),
            Some(1.0)
        );
    }

    #[test]
    fn cancelled_request_records_client_closed_status() {
        let registry = registry();
        let timer = RequestTimer::start(
            Arc::clone(&registry),
            "GET".into(),
            "/slow".into(),
            Some("/slow".into()),
        );
        // Dropped without finalize, as when the request future is cancelled.
        drop(timer);

        assert_eq!(
            counter_value(&registry, HTTP_REQUESTS_TOTAL, "GET", "/slow", "499"),
            Some(1.0)
        );
        assert_eq!(
            counter_value(&registry, HTTP_ERRORS_TOTAL, "GET", "/slow", "499"),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn middleware_observes_routed_and_unmatched_requests() {
        use axum::body::Body;
        use axum::http::{Request as HttpRequest, StatusCode};
        use tower::ServiceExt;

        let registry = registry();
        crate::infrastructure::metrics::register_default_metrics(&registry).unwrap();
        let app = crate::build_router(AppState::new(Arc::clone(&registry)));

        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/no-such-route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        assert_eq!(
            counter_value(&registry, HTTP_REQUESTS_TOTAL, "GET", "/health", "200"),
            Some(1.0)
        );
        assert_eq!(
            counter_value(&registry, HTTP_ERRORS_TOTAL, "GET", UNMATCHED_ROUTE, "404"),
            Some(1.0)
        );
    }
}
