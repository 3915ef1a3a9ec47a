//! Core domain types for the featurebench load-generation engine.

pub mod error;
pub mod gcs;
pub mod request;
pub mod run_id;
pub mod sample;
pub mod stats;

pub use error::{BenchError, BenchResult};
pub use gcs::GcsPath;
pub use request::{EntityRef, FeatureStoreRequest};
pub use run_id::RunIdentity;
pub use sample::SampleResult;
pub use stats::LatencySummary;
