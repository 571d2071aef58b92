pub mod admin;
pub mod credits;
pub mod generations;
pub mod health;
pub mod images;
pub mod models;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generations                         list own jobs, submit (202)
/// /generations/{id}                    poll job
/// /generations/{id}/cancel             cancel running job (POST)
///
/// /credits                             caller's balance
///
/// /images                              public feed (?before=&limit=&hot=&trending=)
/// /images/{id}                         get, delete (owner)
/// /images/{id}/privacy                 toggle privacy (PATCH, owner)
/// /images/{id}/remix                   pre-filled generation params
///
/// /users/me/images                     caller's images, private included
///
/// /models                              catalog: models, styles, ratios, tiers
///
/// /admin/images/{id}/flags             set hot / trending (PATCH, admin)
/// /admin/credits/{user_id}             grant base / bonus credits (POST, admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/generations", generations::router())
        .nest("/credits", credits::router())
        .nest("/images", images::router())
        .nest("/users", users::router())
        .nest("/models", models::router())
        .nest("/admin", admin::router())
}
