//! Row structs and DTOs, one module per table.

pub mod credit_account;
pub mod generated_image;
pub mod generation_job;
