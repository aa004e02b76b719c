use std::collections::BTreeMap;

use quire_types::{Theme, Uid};

use crate::bucket::Bucket;
use crate::document;
use crate::error::StoreResult;
use crate::tx::Tx;

#[derive(Clone, Copy, Debug, Default)]
pub struct ThemeStore;

impl ThemeStore {
    /// Create a theme from template and asset blob ids.
    pub fn create(
        &self,
        tx: &Tx,
        templates: BTreeMap<String, Uid>,
        css_assets: Vec<Uid>,
        js_assets: Vec<Uid>,
    ) -> StoreResult<Theme> {
        let theme = Theme {
            uid: Uid::new(),
            templates,
            css_assets,
            js_assets,
        };
        document::save(tx, Bucket::Themes, &theme.uid.key(), &theme)?;
        Ok(theme)
    }

    pub fn get(&self, tx: &Tx, uid: &Uid) -> StoreResult<Theme> {
        document::one(tx, Bucket::Themes, &uid.key())
    }
}
