pub mod health;
pub use self::health::health;

pub mod me;
pub use self::me::me;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Fallback for `/api` paths no business router claimed. Only reached after
/// the pipeline let the request through.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
