//! Blob and warehouse sinks for featurebench.
//!
//! The engine talks to its durable outputs through two narrow contracts: a
//! [`BlobStore`] for text artifacts and a [`Warehouse`] for columnar load
//! jobs and entity queries. Backends here cover local development and tests;
//! a deployment plugs its managed-cloud clients in behind the same traits.

mod blob;
mod local;
mod memory;
mod warehouse;

pub use blob::{BlobMetadata, BlobStore};
pub use local::{LocalBlobStore, LocalWarehouse};
pub use memory::MemoryBlobStore;
pub use warehouse::{EntityRow, LoadJob, MemoryWarehouse, Warehouse, WriteDisposition};
