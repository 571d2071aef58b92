//! Admin-only routes. Every handler takes [`RequireAdmin`].
//!
//! [`RequireAdmin`]: crate::middleware::rbac::RequireAdmin

use axum::routing::{patch, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// PATCH  /images/{id}/flags   -> update_image_flags
/// POST   /credits/{user_id}   -> grant_credits
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/images/{id}/flags", patch(admin::update_image_flags))
        .route("/credits/{user_id}", post(admin::grant_credits))
}
