//! Authentication primitives.
//!
//! Users sign in through an external auth provider; this service only
//! verifies the HS256 access tokens it issues ([`jwt`]).

pub mod jwt;
