//! API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Layer stack (outermost → innermost):
//! 1. CORS → 2. HTTP trace → 3. Credential extraction → body limit →
//! 4. Access token (all but `/health`) → handler

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Largest accepted request body. Document images are up to 20 MB decoded,
/// about 27 MB once base64-encoded.
pub const MAX_REQUEST_BYTES: usize = 30 * 1024 * 1024;

/// Build the API router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    let public = Router::new().route("/health", get(endpoints::health::check));

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/interviews", post(endpoints::interviews::create))
        .route(
            "/interviews/:id",
            get(endpoints::interviews::get).delete(endpoints::interviews::delete),
        )
        .route("/interviews/:id/next", post(endpoints::interviews::next))
        .route("/interviews/:id/answers", post(endpoints::interviews::answer))
        .route(
            "/interviews/:id/turns/:index/translate",
            post(endpoints::interviews::translate_turn),
        )
        .route("/interviews/:id/report", post(endpoints::interviews::report))
        .route("/reports", post(endpoints::reports::generate))
        .route("/intake/extract", post(endpoints::intake::extract))
        .route("/translate", post(endpoints::translate::translate))
        .route(
            "/history",
            get(endpoints::history::list)
                .post(endpoints::history::save)
                .delete(endpoints::history::clear),
        )
        .route(
            "/history/:id",
            get(endpoints::history::get).delete(endpoints::history::delete),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            ctx.clone(),
            middleware::require_access_token,
        ));

    let cors = cors_layer(&ctx.core.config.allowed_origin);

    let routes = public
        .merge(protected)
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(axum::middleware::from_fn(middleware::extract_credentials));

    Router::new()
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// CORS for the single configured origin. An origin that is not a valid
/// header value allows nothing.
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = HeaderValue::from_str(allowed_origin).ok();
    if origin.is_none() {
        tracing::warn!(allowed_origin, "Allowed origin is not a valid header value");
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origin))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
}
