use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Request-scoped tracing for the REST surface. The span carries the matched
/// route template rather than the raw path, so conversation ids do not explode
/// the span cardinality. WebSocket traffic after the upgrade logs through its
/// own connection spans, not here.
pub fn add_tracing(router: Router<AppState>) -> Router<AppState> {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<_>| {
                let route = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str)
                    .unwrap_or_else(|| req.uri().path());
                tracing::info_span!("request", method = %req.method(), route)
            })
            .on_response(
                |res: &Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    tracing::info!(
                        status = res.status().as_u16(),
                        elapsed_ms = latency.as_millis() as u64,
                        "request completed"
                    );
                },
            ),
    )
}
