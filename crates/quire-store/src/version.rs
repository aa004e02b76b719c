//! Version documents and their path maps.
//!
//! Path-map edits go through [`VersionStore::set_page`] and
//! [`VersionStore::unset_page`], which keep the page-version index in step
//! with the version they edit: a page is a member of a version exactly when
//! at least one path of that version points at it.

use std::collections::BTreeMap;

use quire_types::{Uid, Version};
use tracing::debug;

use crate::bucket::Bucket;
use crate::document;
use crate::error::StoreResult;
use crate::page_version::PageVersionIndex;
use crate::tx::Tx;

#[derive(Clone, Copy, Debug, Default)]
pub struct VersionStore;

impl VersionStore {
    /// Create a version and register each of its pages in the index.
    pub fn create(
        &self,
        tx: &Tx,
        pages: BTreeMap<String, Uid>,
        theme: Uid,
    ) -> StoreResult<Version> {
        let version = Version {
            uid: Uid::new(),
            pages,
            theme,
        };
        document::save(tx, Bucket::Versions, &version.uid.key(), &version)?;
        PageVersionIndex.add_version(tx, &version)?;
        debug!(version = %version.uid, pages = version.pages.len(), "version created");
        Ok(version)
    }

    pub fn get(&self, tx: &Tx, uid: &Uid) -> StoreResult<Version> {
        document::one(tx, Bucket::Versions, &uid.key())
    }

    /// Copy `uid`'s path map and theme into a new version.
    ///
    /// The copy is NOT registered in the page-version index; callers do that
    /// with [`PageVersionIndex::add_version`] once they decide to keep it.
    pub fn clone_version(&self, tx: &Tx, uid: &Uid) -> StoreResult<Version> {
        let source = self.get(tx, uid)?;
        let copy = Version {
            uid: Uid::new(),
            pages: source.pages,
            theme: source.theme,
        };
        document::save(tx, Bucket::Versions, &copy.uid.key(), &copy)?;
        debug!(source = %uid, version = %copy.uid, "version cloned");
        Ok(copy)
    }

    /// Bind `path` to `page` in version `uid`, moving the entry from
    /// `previous_path` when that differs.
    ///
    /// Pages displaced by the move lose their membership if no other path in
    /// the version still points at them.
    pub fn set_page(
        &self,
        tx: &Tx,
        uid: &Uid,
        previous_path: Option<&str>,
        path: &str,
        page: Uid,
    ) -> StoreResult<Version> {
        tx.require_writable()?;
        let mut version = self.get(tx, uid)?;

        let mut displaced = Vec::new();
        if let Some(previous) = previous_path.filter(|p| *p != path) {
            displaced.extend(version.pages.remove(previous));
        }
        displaced.extend(version.pages.insert(path.to_string(), page));
        document::save(tx, Bucket::Versions, &uid.key(), &version)?;

        for old in displaced {
            if old != page && !version.references(&old) {
                PageVersionIndex.remove(tx, &old, uid)?;
            }
        }
        PageVersionIndex.add(tx, &page, uid)?;
        debug!(version = %uid, path, page = %page, "path bound");
        Ok(version)
    }

    /// Remove `path` from version `uid`. Returns the page it pointed at.
    pub fn unset_page(&self, tx: &Tx, uid: &Uid, path: &str) -> StoreResult<Option<Uid>> {
        tx.require_writable()?;
        let mut version = self.get(tx, uid)?;
        let Some(old) = version.pages.remove(path) else {
            return Ok(None);
        };
        document::save(tx, Bucket::Versions, &uid.key(), &version)?;
        if !version.references(&old) {
            PageVersionIndex.remove(tx, &old, uid)?;
        }
        debug!(version = %uid, path, page = %old, "path unbound");
        Ok(Some(old))
    }

    /// Newest-first listing of versions.
    pub fn list(
        &self,
        tx: &Tx,
        cursor: Option<&Uid>,
        limit: usize,
    ) -> StoreResult<(Vec<Version>, Option<Uid>)> {
        let start = cursor.map(Uid::key);
        let (versions, next) = document::many(tx, Bucket::Versions, start.as_deref(), limit)?;
        Ok((versions, next.map(|key| Uid::parse(&key)).transpose()?))
    }
}
