//! Randomized filesystem pounding engine.
//!
//! A single-threaded loop picks one of nine operations per iteration, runs it
//! against a [`pounder_gateway::StorageGateway`], and checks every read
//! against an in-memory [`ShadowModel`] of what should be on disk.

pub mod cancel;
pub mod content;
pub mod engine;
pub mod error;
pub mod invariants;
pub mod ops;
pub mod report;
pub mod shadow;
pub mod stats;

pub use cancel::CancellationToken;
pub use engine::{Engine, EngineOptions, EngineState};
pub use error::EngineError;
pub use invariants::{check_final_consistency, check_shadow_invariants, Violation};
pub use ops::OpKind;
pub use report::Report;
pub use shadow::ShadowModel;
pub use stats::{Anomaly, Collector, Stats};
