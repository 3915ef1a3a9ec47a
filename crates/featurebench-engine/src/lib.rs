//! Closed-loop load-generation engine.
//!
//! The [`LoadManager`] paces 1-second samples against a target QPS; each
//! sample pushes its burst of requests through a bounded-pool
//! [`SampleExecutor`] and the pluggable [`Caller`] capability, collecting
//! per-request latencies for aggregation and result streaming.

pub mod calculator;
mod caller;
mod executor;
mod manager;
mod rest;

pub use caller::{default_endpoint, ApiVersion, Caller, CallerBuilder, ReadMethod};
pub use executor::{SampleExecutor, SampleOutcome};
pub use manager::{LoadConfig, LoadManager, OutputOptions, Phase, RunReport, SampleStrategy};
pub use rest::FeatureStoreCaller;
