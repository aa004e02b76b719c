use quire_types::{Page, Uid, WritablePage};
use tracing::debug;

use crate::bucket::Bucket;
use crate::document;
use crate::error::StoreResult;
use crate::tx::Tx;

#[derive(Clone, Copy, Debug, Default)]
pub struct PageStore;

impl PageStore {
    /// Write a page record. `uid` overwrites that page in place; `None`
    /// allocates a new page.
    ///
    /// Version membership is not touched here.
    pub fn put(
        &self,
        tx: &Tx,
        uid: Option<Uid>,
        write: &WritablePage,
        content: Uid,
    ) -> StoreResult<Page> {
        let uid = uid.unwrap_or_default();
        let page = Page::from_writable(uid, write, content);
        document::save(tx, Bucket::Pages, &uid.key(), &page)?;
        debug!(page = %uid, path = %page.path, blob = %content, "page saved");
        Ok(page)
    }

    pub fn get(&self, tx: &Tx, uid: &Uid) -> StoreResult<Page> {
        document::one(tx, Bucket::Pages, &uid.key())
    }

    /// Newest-first listing of every page record, including forked
    /// predecessors no longer in staging.
    pub fn list(
        &self,
        tx: &Tx,
        cursor: Option<&Uid>,
        limit: usize,
    ) -> StoreResult<(Vec<Page>, Option<Uid>)> {
        let start = cursor.map(Uid::key);
        let (pages, next) = document::many(tx, Bucket::Pages, start.as_deref(), limit)?;
        Ok((pages, next.map(|key| Uid::parse(&key)).transpose()?))
    }
}
