//! Pixora domain layer.
//!
//! Pure, I/O-free building blocks shared by the database, pipeline and API
//! crates: quality tiers and their credit costs, the retry policy for
//! upstream inference calls, the dimension calculator, credit arithmetic,
//! the model/style catalog, and generation request validation.

pub mod catalog;
pub mod credits;
pub mod dimensions;
pub mod error;
pub mod generation;
pub mod quality;
pub mod retry;
pub mod roles;
pub mod types;
