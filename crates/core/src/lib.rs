// crates/core/src/lib.rs
//! Core orchestration for the stemsplit vocal separation service.
//!
//! A submission stages an uploaded audio file into a private workspace,
//! waits for an admission slot bounding concurrent engine runs, invokes
//! the external Demucs engine, and atomically publishes the two stems —
//! or tears the workspace down on any failure. The HTTP server and CLI
//! crates are thin adapters over [`JobOrchestrator`].

pub mod admission;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod types;
pub mod workspace;

pub use admission::{AdmissionPool, AdmissionSlot};
pub use config::SeparatorConfig;
pub use engine::{DemucsEngine, SeparationEngine};
pub use error::{EngineError, SubmitError, WorkspaceError};
pub use orchestrator::JobOrchestrator;
pub use types::{
    is_supported_extension, normalized_extension, CompletedJob, SeparatedStems, Stem,
    SUPPORTED_EXTENSIONS,
};
pub use workspace::{JobWorkspace, WorkspaceStore};
