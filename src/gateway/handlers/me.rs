//! Echo of the authenticated principal. Lives behind the protected tree, so
//! reaching it at all proves the pipeline attached a principal.

use axum::{response::IntoResponse, Json};

use crate::gateway::{token::Claims, Principal};

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Claims of the verified Session Token", body = Claims),
        (status = 401, description = "Token required"),
        (status = 403, description = "Invalid token or origin"),
    ),
    security(("bearer" = [])),
    tag = "session"
)]
pub async fn me(principal: Principal) -> impl IntoResponse {
    Json(principal.into_claims())
}
