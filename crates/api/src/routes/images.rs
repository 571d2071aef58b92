//! Route definitions for the `/images` gallery resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::images;
use crate::state::AppState;

/// Routes mounted at `/images`.
///
/// ```text
/// GET    /                -> list_feed
/// GET    /{id}            -> get_image
/// DELETE /{id}            -> delete_image
/// PATCH  /{id}/privacy    -> set_privacy
/// GET    /{id}/remix      -> remix_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(images::list_feed))
        .route("/{id}", get(images::get_image).delete(images::delete_image))
        .route("/{id}/privacy", patch(images::set_privacy))
        .route("/{id}/remix", get(images::remix_image))
}
