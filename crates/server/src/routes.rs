//! Route configuration.

use crate::auth::{auth_middleware, trace_middleware};
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::rewrite::rewrite_middleware;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use satchel_core::{HEALTH_PATH, HOOKS_PATH, METRICS_PATH};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the application router around `inner`, the upload handler.
///
/// `state` must come from [`AppState::new`], which rejects base paths that
/// overlap the fixed routes.
///
/// The upload chain is mounted at `{base}`, `{base}/` and `{base}/{*path}`.
/// Gate and rewriter wrap `inner` as a service so the rewritten path is the
/// one `inner` routes on; `inner` always sees the full request path.
pub fn create_router(state: AppState, inner: Router) -> Router {
    let base = state.base_path().to_string();

    // Order of execution: Gate -> Rewriter -> upload handler
    let uploads = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rewrite_middleware,
        ))
        .service(inner);

    let hooks = Router::new()
        .route(HOOKS_PATH, post(handlers::tus_hook))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let mut router = Router::new()
        // Health check (unauthenticated for load balancers/k8s probes)
        .route(HEALTH_PATH, get(handlers::health_check))
        .merge(hooks)
        .route_service(&base, uploads.clone())
        .route_service(&format!("{base}/"), uploads.clone())
        .route_service(&format!("{base}/{{*path}}"), uploads);

    // When enabled, this endpoint should be network-restricted to the scraper.
    if state.config.server.metrics_enabled {
        router = router.route(METRICS_PATH, get(metrics_handler));
    }

    router
        .layer(middleware::from_fn(trace_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
