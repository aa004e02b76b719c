//! Foundation types for Quire, a versioned page store.
//!
//! Every other Quire crate depends on `quire-types`. Nothing here touches
//! storage: these are plain values with their serde representation.
//!
//! # Key Types
//!
//! - [`Uid`] — time-ordered, lexicographically sortable identifier (UUID v7)
//! - [`ContentHash`] — BLAKE3 digest of blob bytes
//! - [`Site`], [`Version`], [`Page`], [`Blob`], [`Theme`] — persisted records
//! - [`WritablePage`] — the caller-controlled subset of a [`Page`]

pub mod error;
pub mod hash;
pub mod model;
pub mod path;
pub mod uid;

pub use error::TypeError;
pub use hash::ContentHash;
pub use model::{Blob, Page, Site, Theme, Version, WritablePage};
pub use path::{is_reserved_path, validate_page_path, RESERVED_PREFIXES};
pub use uid::Uid;
