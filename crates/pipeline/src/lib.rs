//! Image generation pipeline.
//!
//! The [`orchestrator::GenerationOrchestrator`] drives one request through
//! validation, credit reservation, the upstream inference call (with the
//! fixed-table retry policy), and persistence. Its collaborators are traits
//! so the state machine can be exercised without a network or database:
//!
//! - [`backend::InferenceBackend`]: the upstream model endpoint.
//! - [`ledger::CreditLedger`]: atomic credit reservation and refund.
//! - [`storage::ObjectStore`]: binary image storage.
//! - [`recorder::ImageRecorder`]: the image metadata row.
//!
//! [`service::GenerationService`] wraps the orchestrator with job rows,
//! background execution, cancellation, and events.

pub mod backend;
pub mod balance_cache;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod recorder;
pub mod registry;
pub mod service;
pub mod state;
pub mod storage;
