//! In-memory path indexes for the published and staging versions.
//!
//! Both indexes are built from their Version documents by [`VersionManager::load`]
//! and published together through one `ArcSwapOption`, so readers see either
//! the old pair or the new pair. The published index is immutable after load;
//! the staging index sits behind a lock and is edited by the page workflows
//! once their transaction has committed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use quire_store::Store;
use quire_types::{Uid, Version};
use tracing::{debug, info};

use crate::error::{SdkError, SdkResult};
use crate::target::Target;

/// A version's path map, held for lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledVersion {
    uid: Uid,
    index: HashMap<String, Uid>,
}

impl CompiledVersion {
    pub fn from_version(version: &Version) -> Self {
        Self {
            uid: version.uid,
            index: version
                .pages
                .iter()
                .map(|(path, page)| (path.clone(), *page))
                .collect(),
        }
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn find(&self, path: &str) -> Option<Uid> {
        self.index.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Sorted copy of the path map.
    pub fn to_map(&self) -> BTreeMap<String, Uid> {
        self.index
            .iter()
            .map(|(path, page)| (path.clone(), *page))
            .collect()
    }
}

struct Compiled {
    published: CompiledVersion,
    staging: RwLock<CompiledVersion>,
}

pub struct VersionManager {
    store: Arc<Store>,
    compiled: ArcSwapOption<Compiled>,
}

impl VersionManager {
    /// An unloaded manager. Current/next lookups fail until [`load`](Self::load).
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            compiled: ArcSwapOption::empty(),
        }
    }

    /// Compile `published` and `staging` from the store and replace any
    /// previously loaded pair.
    pub fn load(&self, published: Uid, staging: Uid) -> SdkResult<()> {
        let (published, staging) = self.store.read(|tx| {
            let versions = self.store.versions();
            Ok((versions.get(tx, &published)?, versions.get(tx, &staging)?))
        })?;
        let compiled = Compiled {
            published: CompiledVersion::from_version(&published),
            staging: RwLock::new(CompiledVersion::from_version(&staging)),
        };
        self.compiled.store(Some(Arc::new(compiled)));
        info!(
            published = %published.uid,
            staging = %staging.uid,
            published_paths = published.pages.len(),
            staging_paths = staging.pages.len(),
            "versions compiled"
        );
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.compiled.load().is_some()
    }

    fn loaded(&self) -> SdkResult<Arc<Compiled>> {
        self.compiled.load_full().ok_or(SdkError::VersionNotCompiled)
    }

    /// The page bound to `path` in `target`.
    ///
    /// Explicit version uids that are not the loaded published or staging
    /// version are read from the store on every call.
    pub fn resolve(&self, target: &Target, path: &str) -> SdkResult<Uid> {
        let found = match target {
            Target::Current => self.loaded()?.published.find(path),
            Target::Next => self.loaded()?.staging.read().find(path),
            Target::Version(uid) => self.resolve_in(uid, path)?,
        };
        found.ok_or_else(|| SdkError::PageNotFound(path.to_string()))
    }

    fn resolve_in(&self, uid: &Uid, path: &str) -> SdkResult<Option<Uid>> {
        if let Some(compiled) = self.compiled.load_full() {
            if compiled.published.uid == *uid {
                return Ok(compiled.published.find(path));
            }
            let staging = compiled.staging.read();
            if staging.uid == *uid {
                return Ok(staging.find(path));
            }
        }
        let version = self.store.read(|tx| self.store.versions().get(tx, uid))?;
        Ok(version.pages.get(path).copied())
    }

    /// Bind `path` to `page` in the staging index, dropping `previous_path`
    /// when the page moved.
    pub fn set_page(&self, previous_path: Option<&str>, path: &str, page: Uid) -> SdkResult<()> {
        let compiled = self.loaded()?;
        let mut staging = compiled.staging.write();
        if let Some(previous) = previous_path.filter(|p| *p != path) {
            staging.index.remove(previous);
        }
        staging.index.insert(path.to_string(), page);
        debug!(path, page = %page, "staging index updated");
        Ok(())
    }

    /// Remove `path` from the staging index.
    pub fn unset_page(&self, path: &str) -> SdkResult<Option<Uid>> {
        let compiled = self.loaded()?;
        let removed = compiled.staging.write().index.remove(path);
        debug!(path, "staging index entry removed");
        Ok(removed)
    }

    /// Copy of the compiled published version.
    pub fn published(&self) -> SdkResult<CompiledVersion> {
        Ok(self.loaded()?.published.clone())
    }

    /// Copy of the compiled staging version.
    pub fn staging(&self) -> SdkResult<CompiledVersion> {
        Ok(self.loaded()?.staging.read().clone())
    }
}

impl std::fmt::Debug for VersionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionManager")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
