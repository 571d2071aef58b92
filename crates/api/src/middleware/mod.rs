//! Request extractors for callers: [`auth::AuthUser`] reads the bearer
//! token (optionally, for public routes that show more to owners) and
//! [`rbac::RequireAdmin`] restricts curation routes.

pub mod auth;
pub mod rbac;
