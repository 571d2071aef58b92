//! Role names carried in access-token claims.

/// Regular signed-in user.
pub const ROLE_AUTHENTICATED: &str = "authenticated";

/// Gallery administrator (may set hot / trending flags).
pub const ROLE_ADMIN: &str = "admin";
