//! Transactional storage for Quire.
//!
//! One redb database holds every document (site, themes, pages, versions,
//! blob records, and the page-version reverse index); blob bytes live as
//! files under a separate root directory. All of it changes together inside
//! one [`Tx`].
//!
//! # Layers
//!
//! - [`Store`] -- opens the database and begins transactions
//! - [`Tx`] -- one unit of work; [`Tx::end`] commits or rolls back exactly once
//! - [`document`] -- typed `one`/`find`/`save`/`remove`/`many` over a [`Bucket`]
//! - [`BlobStore`] -- content blobs with a BLAKE3 digest per blob
//! - [`PageVersionIndex`] -- page uid -> set of versions containing it
//! - [`SiteStore`], [`PageStore`], [`VersionStore`], [`ThemeStore`] -- entity stores
//!
//! # Design Rules
//!
//! 1. Every storage call takes the caller's `&Tx`; nothing opens its own.
//! 2. Writes through a read-only transaction fail with [`StoreError::TxPrivilege`].
//! 3. A cancelled [`CancelToken`] is never committed.
//! 4. Blob bytes become visible under their final name only after commit.

pub mod blob;
pub mod bucket;
pub mod cancel;
pub mod document;
pub mod error;
pub mod page;
pub mod page_version;
pub mod site;
pub mod store;
pub mod theme;
pub mod tx;
pub mod version;

pub use blob::BlobStore;
pub use bucket::{Bucket, SITE_KEY};
pub use cancel::CancelToken;
pub use error::{StoreError, StoreResult};
pub use page::PageStore;
pub use page_version::PageVersionIndex;
pub use site::SiteStore;
pub use store::Store;
pub use theme::ThemeStore;
pub use tx::Tx;
pub use version::VersionStore;
