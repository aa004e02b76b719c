use quire_types::{Site, Uid};
use tracing::info;

use crate::bucket::{Bucket, SITE_KEY};
use crate::document;
use crate::error::StoreResult;
use crate::tx::Tx;

/// The site singleton, stored under a fixed key in the `app` bucket.
#[derive(Clone, Copy, Debug, Default)]
pub struct SiteStore;

impl SiteStore {
    pub fn get(&self, tx: &Tx) -> StoreResult<Site> {
        document::one(tx, Bucket::App, SITE_KEY)
    }

    /// The site, or `None` before provisioning.
    pub fn find(&self, tx: &Tx) -> StoreResult<Option<Site>> {
        document::find(tx, Bucket::App, SITE_KEY)
    }

    pub fn create(&self, tx: &Tx, title: &str, version: Uid, next_version: Uid) -> StoreResult<Site> {
        let site = Site {
            uid: Uid::new(),
            title: title.to_string(),
            version,
            next_version,
        };
        document::save(tx, Bucket::App, SITE_KEY, &site)?;
        info!(site = %site.uid, version = %version, next = %next_version, "site created");
        Ok(site)
    }

    /// Change the title. An empty title leaves the record unchanged.
    pub fn update_title(&self, tx: &Tx, title: &str) -> StoreResult<Site> {
        let mut site = self.get(tx)?;
        if title.is_empty() || title == site.title {
            return Ok(site);
        }
        site.title = title.to_string();
        document::save(tx, Bucket::App, SITE_KEY, &site)?;
        Ok(site)
    }
}
