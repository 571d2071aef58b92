//! HTTP client for hosted text-to-image inference endpoints.
//!
//! Provides the request/response wrapper around one model endpoint
//! ([`api::InferenceApi`]) and the rotating pool of upstream API
//! credentials ([`credentials::CredentialPool`]).

pub mod api;
pub mod credentials;

pub use api::{InferenceApi, InferenceApiError, InferenceImage};
pub use credentials::CredentialPool;
