//! High-level SDK for Quire.
//!
//! [`Quire`] is the entry point for applications embedding a Quire store:
//! it provisions a fresh database, keeps the published and staging versions
//! compiled in memory, and runs the copy-on-write page workflows.

pub mod config;
pub mod error;
pub mod provision;
pub mod repository;
pub mod target;
pub mod version_manager;

pub use config::QuireConfig;
pub use error::{ErrorClass, SdkError, SdkResult};
pub use provision::Provisioned;
pub use repository::{PutOutcome, Quire};
pub use target::Target;
pub use version_manager::{CompiledVersion, VersionManager};

// Re-export key types
pub use quire_store::{CancelToken, Store, StoreError};
pub use quire_types::{Blob, Page, Site, Theme, Uid, Version, WritablePage};
