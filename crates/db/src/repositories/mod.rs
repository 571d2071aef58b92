//! Repository structs: stateless namespaces of async query functions that
//! take a `&PgPool`.

pub mod credit_repo;
pub mod generated_image_repo;
pub mod generation_job_repo;

pub use credit_repo::CreditRepo;
pub use generated_image_repo::GeneratedImageRepo;
pub use generation_job_repo::GenerationJobRepo;
