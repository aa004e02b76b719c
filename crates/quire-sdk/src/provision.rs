//! First-run bootstrap: the minimum set of records a site needs.

use quire_store::{CancelToken, Store, StoreResult, Tx};
use quire_types::{Site, WritablePage};
use tracing::info;

/// Template every bootstrap page renders with.
pub const DEFAULT_TEMPLATE_NAME: &str = "default";

pub const HOME_PATH: &str = "/";
pub const HOME_TITLE: &str = "Home";

const DEFAULT_THEME_TEMPLATE: &str = r#"
<!doctype html>
<html>
<head>
	<!-- quire:assets:css -->
</head>
<body>
	{{{ content }}}
	<!-- quire:assets:js -->
</body>
</html>
"#;

const DEFAULT_PAGE: &str = r#"
<h1>Welcome to Quire</h1>
"#;

/// Outcome of [`provision`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provisioned {
    /// The store was empty and has been bootstrapped.
    Created(Site),
    /// A site already existed; nothing was written.
    Existing(Site),
}

impl Provisioned {
    pub fn site(&self) -> &Site {
        match self {
            Self::Created(site) | Self::Existing(site) => site,
        }
    }

    pub fn into_site(self) -> Site {
        match self {
            Self::Created(site) | Self::Existing(site) => site,
        }
    }
}

/// Create the home page, default theme, published and staging versions, and
/// the site, all in one transaction. Does nothing when a site exists.
pub fn provision(store: &Store, cancel: &CancelToken, title: &str) -> StoreResult<Provisioned> {
    store.write(cancel, |tx| {
        if let Some(site) = store.sites().find(tx)? {
            return Ok(Provisioned::Existing(site));
        }
        let site = bootstrap(store, tx, title)?;
        info!(site = %site.uid, title = %site.title, "site provisioned");
        Ok(Provisioned::Created(site))
    })
}

fn bootstrap(store: &Store, tx: &Tx, title: &str) -> StoreResult<Site> {
    let page_blob = store.blobs().create(tx, DEFAULT_PAGE.as_bytes())?;
    let home = store.pages().put(
        tx,
        None,
        &WritablePage::at(HOME_PATH)
            .with_title(HOME_TITLE)
            .with_template(DEFAULT_TEMPLATE_NAME),
        page_blob.uid,
    )?;

    let template_blob = store.blobs().create(tx, DEFAULT_THEME_TEMPLATE.as_bytes())?;
    let theme = store.themes().create(
        tx,
        [(DEFAULT_TEMPLATE_NAME.to_string(), template_blob.uid)].into(),
        Vec::new(),
        Vec::new(),
    )?;

    let published = store
        .versions()
        .create(tx, [(home.path.clone(), home.uid)].into(), theme.uid)?;
    let staging = store.versions().clone_version(tx, &published.uid)?;
    store.page_versions().add_version(tx, &staging)?;

    store.sites().create(tx, title, published.uid, staging.uid)
}
