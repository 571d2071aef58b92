//! Pixora in-process event bus.
//!
//! - [`EventBus`]: publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`DomainEvent`]: the domain event envelope.
//!
//! The generation pipeline publishes job outcomes and balance changes here;
//! the API binary runs a subscriber that logs each one.

pub mod bus;

pub use bus::{DomainEvent, EventBus};
