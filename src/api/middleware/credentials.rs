//! Caller credential extraction.
//!
//! Reads the model API key from `X-Api-Key` and injects `RequestCredentials`
//! into request extensions. A missing key is not rejected here: only routes
//! that call the model need one, and they fail with `API_KEY_REQUIRED`.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::pipeline::model::ApiKey;

pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Credentials supplied with the current request.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    api_key: Option<ApiKey>,
}

impl RequestCredentials {
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self { api_key }
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }
}

/// Inject `RequestCredentials` and mark every response `no-store`
/// (responses carry patient data).
pub async fn extract_credentials(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(ApiKey::parse);

    req.extensions_mut().insert(RequestCredentials::new(api_key));

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));
    response
}
