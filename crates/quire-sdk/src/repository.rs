use std::sync::Arc;

use parking_lot::Mutex;
use quire_store::{Bucket, CancelToken, Store, StoreError, StoreResult, Tx};
use quire_types::{validate_page_path, Page, Site, Theme, Uid, Version, WritablePage};
use tracing::{debug, error, info};

use crate::config::QuireConfig;
use crate::error::{SdkError, SdkResult};
use crate::provision::{provision, Provisioned};
use crate::target::Target;
use crate::version_manager::VersionManager;

/// High-level Quire API.
///
/// Owns the store and the compiled version indexes. Page edits go through
/// [`put_page`](Self::put_page) and [`delete_page`](Self::delete_page), which
/// write every affected record in one transaction and then mirror the change
/// into the staging index.
///
/// Writes that touch the staging version hold `writer` from before the
/// transaction opens until the compiled index reflects its commit, so the
/// index sees edits in commit order. Recompiling takes the same lock.
pub struct Quire {
    config: QuireConfig,
    store: Arc<Store>,
    versions: VersionManager,
    writer: Mutex<()>,
}

/// Result of [`Quire::put_page`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOutcome {
    pub page: Page,
    /// Set when the write could not touch the existing page and created a
    /// new one instead.
    pub forked_from: Option<Uid>,
}

impl Quire {
    /// Open the database and blob root named by `config`.
    pub fn open(config: QuireConfig) -> SdkResult<Self> {
        let store = Store::open(&config.database_file, config.blob_root.clone())?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn with_store(store: Arc<Store>, config: QuireConfig) -> Self {
        let versions = VersionManager::new(Arc::clone(&store));
        Self {
            config,
            store,
            versions,
            writer: Mutex::new(()),
        }
    }

    /// Provision if needed, then compile the published and staging versions.
    pub fn start(&self) -> SdkResult<Site> {
        let site = self.provision()?.into_site();
        let _writer = self.writer.lock();
        self.versions.load(site.version, site.next_version)?;
        info!(site = %site.uid, "quire started");
        Ok(site)
    }

    pub fn provision(&self) -> SdkResult<Provisioned> {
        Ok(provision(
            &self.store,
            &CancelToken::new(),
            &self.config.site_title,
        )?)
    }

    /// Re-read the site and recompile both versions.
    pub fn reload(&self) -> SdkResult<()> {
        let _writer = self.writer.lock();
        self.recompile()
    }

    fn recompile(&self) -> SdkResult<()> {
        let site = self.site()?;
        self.versions.load(site.version, site.next_version)
    }

    /// Run a staging write and mirror it into the compiled index.
    ///
    /// Refuses to start before the index is loaded, since the commit could
    /// not be mirrored. If the transaction committed but still failed, the
    /// index is recompiled from the store before the error is returned.
    fn write_staging<T>(
        &self,
        cancel: &CancelToken,
        work: impl FnOnce(&Tx) -> StoreResult<T>,
        apply: impl FnOnce(&VersionManager, &T) -> SdkResult<()>,
    ) -> SdkResult<T> {
        let _writer = self.writer.lock();
        if !self.versions.is_loaded() {
            return Err(SdkError::VersionNotCompiled);
        }
        match self.store.write(cancel, work) {
            Ok(value) => {
                apply(&self.versions, &value)?;
                Ok(value)
            }
            Err(err) if err.is_committed() => {
                error!(error = %err, "write committed with errors, recompiling versions");
                self.recompile()?;
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn config(&self) -> &QuireConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn version_manager(&self) -> &VersionManager {
        &self.versions
    }

    // ---- Site ----

    pub fn site(&self) -> SdkResult<Site> {
        Ok(self.store.read(|tx| self.store.sites().get(tx))?)
    }

    /// Rename the site. An empty title is ignored.
    pub fn update_site(&self, cancel: &CancelToken, title: &str) -> SdkResult<Site> {
        Ok(self
            .store
            .write(cancel, |tx| self.store.sites().update_title(tx, title))?)
    }

    // ---- Read accessors ----

    pub fn page(&self, uid: &Uid) -> SdkResult<Page> {
        Ok(self.store.read(|tx| self.store.pages().get(tx, uid))?)
    }

    /// One page of page records, newest first. Pass the returned cursor back
    /// to continue.
    pub fn pages(&self, cursor: Option<&Uid>) -> SdkResult<(Vec<Page>, Option<Uid>)> {
        Ok(self
            .store
            .read(|tx| self.store.pages().list(tx, cursor, self.config.page_size))?)
    }

    pub fn version(&self, uid: &Uid) -> SdkResult<Version> {
        Ok(self.store.read(|tx| self.store.versions().get(tx, uid))?)
    }

    pub fn versions(&self, cursor: Option<&Uid>) -> SdkResult<(Vec<Version>, Option<Uid>)> {
        Ok(self
            .store
            .read(|tx| self.store.versions().list(tx, cursor, self.config.page_size))?)
    }

    pub fn theme(&self, uid: &Uid) -> SdkResult<Theme> {
        Ok(self.store.read(|tx| self.store.themes().get(tx, uid))?)
    }

    /// The bytes of a page's content blob.
    pub fn content(&self, page: &Uid) -> SdkResult<Vec<u8>> {
        Ok(self.store.read(|tx| {
            let page = self.store.pages().get(tx, page)?;
            self.store.blobs().get(tx, &page.content)
        })?)
    }

    /// The raw source of a theme template.
    pub fn template(&self, theme: &Uid, name: &str) -> SdkResult<Vec<u8>> {
        Ok(self.store.read(|tx| {
            let theme = self.store.themes().get(tx, theme)?;
            let blob = theme
                .templates
                .get(name)
                .ok_or_else(|| StoreError::NotFound {
                    bucket: Bucket::Themes.name(),
                    key: format!("{}/{name}", theme.uid),
                })?;
            self.store.blobs().get(tx, blob)
        })?)
    }

    // ---- Version selection ----

    /// Turn a caller's version selector into a [`Target`]. Explicit uids
    /// other than the published and staging version must exist.
    pub fn target(&self, selector: Option<&str>, write: bool) -> SdkResult<Target> {
        let site = self.site()?;
        let target = Target::select(selector, &site, write)?;
        if let Target::Version(uid) = target {
            self.version(&uid)?;
        }
        Ok(target)
    }

    /// The page id bound to `path` in `target`.
    pub fn resolve(&self, target: &Target, path: &str) -> SdkResult<Uid> {
        self.versions.resolve(target, path)
    }

    /// The page record bound to `path` in `target`.
    pub fn resolve_page(&self, target: &Target, path: &str) -> SdkResult<Page> {
        let uid = self.resolve(target, path)?;
        self.page(&uid)
    }

    // ---- Page workflows ----

    /// Create a page (`uid` is `None`) or edit an existing one, in the
    /// staging version.
    ///
    /// An existing page is edited in place only when staging is the sole
    /// version referencing it; otherwise a new page is created and the
    /// staging path is repointed, leaving every other version untouched.
    pub fn put_page(
        &self,
        cancel: &CancelToken,
        uid: Option<Uid>,
        write: &WritablePage,
        content: &[u8],
    ) -> SdkResult<PutOutcome> {
        validate_page_path(&write.path)?;
        let (outcome, _) = self.write_staging(
            cancel,
            |tx| self.put_page_tx(tx, uid, write, content),
            |versions, (outcome, previous_path): &(PutOutcome, Option<String>)| {
                versions.set_page(previous_path.as_deref(), &outcome.page.path, outcome.page.uid)
            },
        )?;
        Ok(outcome)
    }

    fn put_page_tx(
        &self,
        tx: &Tx,
        uid: Option<Uid>,
        write: &WritablePage,
        content: &[u8],
    ) -> StoreResult<(PutOutcome, Option<String>)> {
        let site = self.store.sites().get(tx)?;
        let staging = self.store.versions().get(tx, &site.next_version)?;
        let existing = uid
            .map(|uid| self.store.pages().get(tx, &uid))
            .transpose()?;

        if let Some(bound) = staging.pages.get(&write.path) {
            if existing.as_ref().map(|p| p.uid) != Some(*bound) {
                return Err(StoreError::InvalidInput(format!(
                    "path {} is already used by page {bound}",
                    write.path
                )));
            }
        }

        let Some(existing) = existing else {
            let page = self.create_page(tx, &staging, None, write, content)?;
            return Ok((
                PutOutcome {
                    page,
                    forked_from: None,
                },
                None,
            ));
        };

        // Only an entry that still points at this page may be moved.
        let previous_path = staging.path_of(&existing.uid).map(str::to_string);

        let members = self.store.page_versions().versions(tx, &existing.uid)?;
        if members.is_empty() {
            error!(page = %existing.uid, "page belongs to no version");
            return Err(StoreError::UnexpectedState(format!(
                "expected page {} to belong to at least one version",
                existing.uid
            )));
        }

        if members.len() == 1 && members.contains(&staging.uid) {
            let page = self.update_page(
                tx,
                &staging,
                previous_path.as_deref(),
                &existing,
                write,
                content,
            )?;
            return Ok((
                PutOutcome {
                    page,
                    forked_from: None,
                },
                previous_path,
            ));
        }

        debug!(page = %existing.uid, versions = members.len(), "page is shared, forking");
        let page = self.create_page(tx, &staging, previous_path.as_deref(), write, content)?;
        Ok((
            PutOutcome {
                page,
                forked_from: Some(existing.uid),
            },
            previous_path,
        ))
    }

    fn create_page(
        &self,
        tx: &Tx,
        staging: &Version,
        previous_path: Option<&str>,
        write: &WritablePage,
        content: &[u8],
    ) -> StoreResult<Page> {
        let blob = self.store.blobs().create(tx, content)?;
        let page = self.store.pages().put(tx, None, write, blob.uid)?;
        self.store
            .versions()
            .set_page(tx, &staging.uid, previous_path, &page.path, page.uid)?;
        info!(page = %page.uid, path = %page.path, "page created");
        Ok(page)
    }

    fn update_page(
        &self,
        tx: &Tx,
        staging: &Version,
        previous_path: Option<&str>,
        current: &Page,
        write: &WritablePage,
        content: &[u8],
    ) -> StoreResult<Page> {
        let blob = self.store.blobs().get_blob(tx, &current.content)?;
        if !blob.matches(content) {
            self.store.blobs().update(tx, &blob.uid, content)?;
        }
        let page = self.store.pages().put(tx, Some(current.uid), write, blob.uid)?;
        self.store
            .versions()
            .set_page(tx, &staging.uid, previous_path, &page.path, page.uid)?;
        info!(page = %page.uid, path = %page.path, "page updated in place");
        Ok(page)
    }

    /// Remove a page from the staging version. The page and its blob stay
    /// in the store for any other version that references them.
    ///
    /// Returns the path the page was bound to.
    pub fn delete_page(&self, cancel: &CancelToken, uid: &Uid) -> SdkResult<String> {
        self.write_staging(
            cancel,
            |tx| self.delete_page_tx(tx, uid),
            |versions, path: &String| versions.unset_page(path).map(drop),
        )
    }

    fn delete_page_tx(&self, tx: &Tx, uid: &Uid) -> StoreResult<String> {
        let site = self.store.sites().get(tx)?;
        let page = self.store.pages().get(tx, uid)?;
        let staging = self.store.versions().get(tx, &site.next_version)?;
        let path = staging
            .path_of(&page.uid)
            .map(str::to_string)
            .ok_or_else(|| StoreError::NotFound {
                bucket: Bucket::Versions.name(),
                key: format!("{}:{}", staging.uid, page.uid),
            })?;
        self.store.versions().unset_page(tx, &staging.uid, &path)?;
        info!(page = %page.uid, path = %path, "page removed from staging");
        Ok(path)
    }
}

impl std::fmt::Debug for Quire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quire")
            .field("store", &self.store)
            .field("versions", &self.versions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use std::time::Duration;
    use crate::provision::{DEFAULT_TEMPLATE_NAME, HOME_PATH, HOME_TITLE};
    use proptest::prelude::*;
    use quire_store::document;
    use std::collections::{BTreeMap, BTreeSet};

    fn started() -> (tempfile::TempDir, Quire) {
        let dir = tempfile::tempdir().unwrap();
        let config = QuireConfig {
            page_size: 3,
            ..QuireConfig::default()
        }
        .rooted_at(dir.path());
        let quire = Quire::open(config).unwrap();
        quire.start().unwrap();
        (dir, quire)
    }

    fn put(quire: &Quire, uid: Option<Uid>, path: &str, content: &str) -> PutOutcome {
        quire
            .put_page(
                &CancelToken::new(),
                uid,
                &WritablePage::at(path).with_template(DEFAULT_TEMPLATE_NAME),
                content.as_bytes(),
            )
            .unwrap()
    }

    /// Freeze the current staging path map into a new, indexed version, as
    /// a publish would.
    fn snapshot_staging(quire: &Quire) -> Version {
        let store = quire.store();
        store
            .write(&CancelToken::new(), |tx| {
                let site = store.sites().get(tx)?;
                let copy = store.versions().clone_version(tx, &site.next_version)?;
                store.page_versions().add_version(tx, &copy)?;
                Ok(copy)
            })
            .unwrap()
    }

    fn blob_count(quire: &Quire) -> usize {
        std::fs::read_dir(&quire.config().blob_root).unwrap().count()
    }

    /// Index and version path maps agree, and the compiled staging index
    /// mirrors the persisted staging version.
    fn assert_consistent(quire: &Quire) {
        let store = quire.store();
        let (versions, pages, index): (Vec<Version>, Vec<Page>, BTreeMap<Uid, BTreeSet<Uid>>) =
            store
                .read(|tx| {
                    let (versions, _) = document::many::<Version>(tx, Bucket::Versions, None, usize::MAX)?;
                    let (pages, _) = document::many::<Page>(tx, Bucket::Pages, None, usize::MAX)?;
                    let mut index = BTreeMap::new();
                    for page in &pages {
                        index.insert(page.uid, store.page_versions().versions(tx, &page.uid)?);
                    }
                    Ok((versions, pages, index))
                })
                .unwrap();

        for page in &pages {
            let expected: BTreeSet<Uid> = versions
                .iter()
                .filter(|v| v.references(&page.uid))
                .map(|v| v.uid)
                .collect();
            assert_eq!(index[&page.uid], expected, "index of page {}", page.uid);
        }

        let site = quire.site().unwrap();
        let staging = versions
            .iter()
            .find(|v| v.uid == site.next_version)
            .unwrap();
        assert_eq!(
            quire.version_manager().staging().unwrap().to_map(),
            staging.pages
        );
    }

    // ---- Provisioning ----

    #[test]
    fn provisioned_site_resolves_home_in_both_versions() {
        let (_dir, quire) = started();
        let site = quire.site().unwrap();
        assert_ne!(site.version, site.next_version);

        let current = quire.resolve(&Target::Current, HOME_PATH).unwrap();
        let next = quire.resolve(&Target::Next, HOME_PATH).unwrap();
        assert_eq!(current, next);

        let home = quire.page(&current).unwrap();
        assert_eq!(home.title, HOME_TITLE);
        let theme = quire.theme(&quire.version(&site.version).unwrap().theme).unwrap();
        assert_eq!(theme.templates.len(), 1);
        assert!(!quire
            .template(&theme.uid, DEFAULT_TEMPLATE_NAME)
            .unwrap()
            .is_empty());

        let (pages, cursor) = quire.pages(None).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(cursor.is_none());
        assert_consistent(&quire);
    }

    #[test]
    fn restart_keeps_the_provisioned_site() {
        let dir = tempfile::tempdir().unwrap();
        let config = QuireConfig::default().rooted_at(dir.path());
        let first = {
            let quire = Quire::open(config.clone()).unwrap();
            let site = quire.start().unwrap();
            put(&quire, None, "/about", "hello");
            site
        };
        let quire = Quire::open(config).unwrap();
        let second = quire.start().unwrap();
        assert_eq!(first, second);
        assert!(quire.resolve(&Target::Next, "/about").is_ok());
    }

    #[test]
    fn lookups_before_start_are_not_compiled() {
        let dir = tempfile::tempdir().unwrap();
        let quire = Quire::open(QuireConfig::default().rooted_at(dir.path())).unwrap();
        quire.provision().unwrap();
        assert!(matches!(
            quire.resolve(&Target::Current, "/"),
            Err(SdkError::VersionNotCompiled)
        ));
    }

    #[test]
    fn writes_before_start_are_refused_without_committing() {
        let dir = tempfile::tempdir().unwrap();
        let quire = Quire::open(QuireConfig::default().rooted_at(dir.path())).unwrap();
        let site = quire.provision().unwrap().into_site();
        let staged = || quire.version(&site.next_version).unwrap().pages;
        let before = staged();

        let err = quire
            .put_page(&CancelToken::new(), None, &WritablePage::at("/about"), b"hello")
            .unwrap_err();
        assert!(matches!(err, SdkError::VersionNotCompiled));
        let home = before[HOME_PATH];
        let err = quire.delete_page(&CancelToken::new(), &home).unwrap_err();
        assert!(matches!(err, SdkError::VersionNotCompiled));
        assert_eq!(staged(), before);
        assert_eq!(quire.pages(None).unwrap().0.len(), 1);

        // once started, the same create goes through
        quire.start().unwrap();
        put(&quire, None, "/about", "hello");
        assert_consistent(&quire);
    }

    // ---- Creation ----

    #[test]
    fn new_page_is_staged_only() {
        let (_dir, quire) = started();
        let created = put(&quire, None, "/about", "hello");
        assert!(created.forked_from.is_none());

        assert_eq!(
            quire.resolve(&Target::Next, "/about").unwrap(),
            created.page.uid
        );
        let err = quire.resolve(&Target::Current, "/about").unwrap_err();
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert_eq!(quire.content(&created.page.uid).unwrap(), b"hello");
        assert_consistent(&quire);
    }

    // ---- In-place edits ----

    #[test]
    fn staged_page_is_edited_in_place() {
        let (_dir, quire) = started();
        let created = put(&quire, None, "/about", "hello");
        let before = quire
            .store()
            .read(|tx| quire.store().blobs().get_blob(tx, &created.page.content))
            .unwrap();

        let edited = put(&quire, Some(created.page.uid), "/about", "hello world");
        assert_eq!(edited.page.uid, created.page.uid);
        assert!(edited.forked_from.is_none());
        assert_eq!(edited.page.content, created.page.content);

        let after = quire
            .store()
            .read(|tx| quire.store().blobs().get_blob(tx, &created.page.content))
            .unwrap();
        assert_ne!(after.hash, before.hash);
        assert!(after.matches(b"hello world"));
        assert_eq!(quire.content(&created.page.uid).unwrap(), b"hello world");
        assert_consistent(&quire);
    }

    #[test]
    fn metadata_only_edit_keeps_the_blob() {
        let (_dir, quire) = started();
        let created = put(&quire, None, "/about", "hello");
        let blobs = blob_count(&quire);

        let edited = quire
            .put_page(
                &CancelToken::new(),
                Some(created.page.uid),
                &WritablePage::at("/about").with_title("About us"),
                b"hello",
            )
            .unwrap();

        assert_eq!(edited.page.content, created.page.content);
        assert_eq!(edited.page.title, "About us");
        assert_eq!(blob_count(&quire), blobs);
        let blob = quire
            .store()
            .read(|tx| quire.store().blobs().get_blob(tx, &created.page.content))
            .unwrap();
        assert!(blob.matches(b"hello"));
    }

    #[test]
    fn moving_a_staged_page_rebinds_its_path() {
        let (_dir, quire) = started();
        let created = put(&quire, None, "/about", "hello");
        let moved = put(&quire, Some(created.page.uid), "/team", "hello");

        assert_eq!(moved.page.uid, created.page.uid);
        assert!(quire.resolve(&Target::Next, "/about").is_err());
        assert_eq!(
            quire.resolve(&Target::Next, "/team").unwrap(),
            created.page.uid
        );
        assert_consistent(&quire);
    }

    // ---- Forks ----

    #[test]
    fn shared_page_is_forked() {
        let (_dir, quire) = started();
        let home = quire.resolve(&Target::Current, HOME_PATH).unwrap();
        let original = quire.content(&home).unwrap();

        let edited = put(&quire, Some(home), HOME_PATH, "<h1>New home</h1>");
        assert_ne!(edited.page.uid, home);
        assert_eq!(edited.forked_from, Some(home));

        assert_eq!(quire.resolve(&Target::Current, HOME_PATH).unwrap(), home);
        assert_eq!(quire.content(&home).unwrap(), original);
        assert_eq!(
            quire.resolve(&Target::Next, HOME_PATH).unwrap(),
            edited.page.uid
        );
        assert_eq!(quire.content(&edited.page.uid).unwrap(), b"<h1>New home</h1>");

        let site = quire.site().unwrap();
        let members = quire
            .store()
            .read(|tx| quire.store().page_versions().versions(tx, &home))
            .unwrap();
        assert_eq!(members, BTreeSet::from([site.version]));
        assert_consistent(&quire);
    }

    #[test]
    fn forked_page_is_then_edited_in_place() {
        let (_dir, quire) = started();
        let home = quire.resolve(&Target::Current, HOME_PATH).unwrap();
        let fork = put(&quire, Some(home), HOME_PATH, "one");
        let again = put(&quire, Some(fork.page.uid), HOME_PATH, "two");
        assert_eq!(again.page.uid, fork.page.uid);
        assert!(again.forked_from.is_none());
        assert_consistent(&quire);
    }

    #[test]
    fn fork_with_move_frees_the_old_path() {
        let (_dir, quire) = started();
        let home = quire.resolve(&Target::Current, HOME_PATH).unwrap();
        let fork = put(&quire, Some(home), "/start", "moved");

        assert!(quire.resolve(&Target::Next, HOME_PATH).is_err());
        assert_eq!(quire.resolve(&Target::Next, "/start").unwrap(), fork.page.uid);
        assert_eq!(quire.resolve(&Target::Current, HOME_PATH).unwrap(), home);
        assert_consistent(&quire);
    }

    #[test]
    fn page_shared_with_historical_version_is_forked() {
        let (_dir, quire) = started();
        let created = put(&quire, None, "/about", "hello");
        let snapshot = snapshot_staging(&quire);

        let edited = put(&quire, Some(created.page.uid), "/about", "changed");
        assert_eq!(edited.forked_from, Some(created.page.uid));
        assert_eq!(
            quire
                .resolve(&Target::Version(snapshot.uid), "/about")
                .unwrap(),
            created.page.uid
        );
        assert_eq!(quire.content(&created.page.uid).unwrap(), b"hello");
        assert_consistent(&quire);
    }

    // ---- Rejections ----

    #[test]
    fn page_in_no_version_is_unexpected_state() {
        let (_dir, quire) = started();
        let created = put(&quire, None, "/about", "hello");
        let staging = quire.site().unwrap().next_version;
        let store = quire.store();
        store
            .write(&CancelToken::new(), |tx| {
                store.page_versions().remove(tx, &created.page.uid, &staging)
            })
            .unwrap();

        let err = quire
            .put_page(
                &CancelToken::new(),
                Some(created.page.uid),
                &WritablePage::at("/about"),
                b"x",
            )
            .unwrap_err();
        assert!(matches!(err, SdkError::Store(StoreError::UnexpectedState(_))));
        assert_eq!(err.class(), ErrorClass::Internal);
    }

    #[test]
    fn unknown_page_uid_is_not_found() {
        let (_dir, quire) = started();
        let err = quire
            .put_page(
                &CancelToken::new(),
                Some(Uid::new()),
                &WritablePage::at("/x"),
                b"x",
            )
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[test]
    fn invalid_and_reserved_paths_are_rejected() {
        let (_dir, quire) = started();
        for path in ["about", "/api/pages", "/a/../b", "/with space", ""] {
            let err = quire
                .put_page(&CancelToken::new(), None, &WritablePage::at(path), b"x")
                .unwrap_err();
            assert_eq!(err.class(), ErrorClass::InvalidInput, "path {path:?}");
        }
        assert_eq!(blob_count(&quire), 2);
    }

    #[test]
    fn taken_path_is_rejected_without_side_effects() {
        let (_dir, quire) = started();
        let about = put(&quire, None, "/about", "hello");
        let blobs = blob_count(&quire);

        let err = quire
            .put_page(&CancelToken::new(), None, &WritablePage::at("/about"), b"other")
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::InvalidInput);

        let team = put(&quire, None, "/team", "team");
        let err = quire
            .put_page(
                &CancelToken::new(),
                Some(team.page.uid),
                &WritablePage::at("/about"),
                b"team",
            )
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::InvalidInput);

        assert_eq!(blob_count(&quire), blobs + 1);
        assert_eq!(
            quire.resolve(&Target::Next, "/about").unwrap(),
            about.page.uid
        );
        assert_consistent(&quire);
    }

    #[test]
    fn cancelled_put_leaves_no_trace() {
        let (_dir, quire) = started();
        let blobs = blob_count(&quire);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = quire
            .put_page(&cancel, None, &WritablePage::at("/about"), b"hello")
            .unwrap_err();
        assert!(matches!(err, SdkError::Store(StoreError::Cancelled)));
        assert!(quire.resolve(&Target::Next, "/about").is_err());
        assert_eq!(quire.pages(None).unwrap().0.len(), 1);
        assert_eq!(blob_count(&quire), blobs);
        assert_consistent(&quire);
    }

    // ---- Deletion ----

    #[test]
    fn delete_removes_from_staging_only() {
        let (_dir, quire) = started();
        let home = quire.resolve(&Target::Current, HOME_PATH).unwrap();

        let path = quire.delete_page(&CancelToken::new(), &home).unwrap();
        assert_eq!(path, HOME_PATH);
        assert!(matches!(
            quire.resolve(&Target::Next, HOME_PATH),
            Err(SdkError::PageNotFound(_))
        ));
        assert_eq!(quire.resolve(&Target::Current, HOME_PATH).unwrap(), home);
        // the record survives for the published version
        assert!(quire.page(&home).is_ok());
        assert!(quire.content(&home).is_ok());
        assert_consistent(&quire);

        let err = quire.delete_page(&CancelToken::new(), &home).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn deleted_path_can_be_reused() {
        let (_dir, quire) = started();
        let about = put(&quire, None, "/about", "hello");
        quire.delete_page(&CancelToken::new(), &about.page.uid).unwrap();
        let again = put(&quire, None, "/about", "again");
        assert_ne!(again.page.uid, about.page.uid);
        assert_consistent(&quire);
    }

    #[test]
    fn editing_a_page_deleted_from_staging_forks_it_back() {
        let (_dir, quire) = started();
        let home = quire.resolve(&Target::Current, HOME_PATH).unwrap();
        quire.delete_page(&CancelToken::new(), &home).unwrap();

        let restored = put(&quire, Some(home), HOME_PATH, "back");
        assert_eq!(restored.forked_from, Some(home));
        assert_eq!(
            quire.resolve(&Target::Next, HOME_PATH).unwrap(),
            restored.page.uid
        );
        assert_consistent(&quire);
    }

    // ---- Site and listing ----

    #[test]
    fn site_title_updates() {
        let (_dir, quire) = started();
        let site = quire.update_site(&CancelToken::new(), "Handbook").unwrap();
        assert_eq!(site.title, "Handbook");
        let site = quire.update_site(&CancelToken::new(), "").unwrap();
        assert_eq!(site.title, "Handbook");
    }

    #[test]
    fn pages_are_listed_through_cursor() {
        let (_dir, quire) = started();
        for i in 0..4 {
            put(&quire, None, &format!("/p{i}"), "x");
        }
        let (first, cursor) = quire.pages(None).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].path, "/p3");
        let (rest, cursor) = quire.pages(cursor.as_ref()).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].path, HOME_PATH);
        assert!(cursor.is_none());

        let (versions, _) = quire.versions(None).unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn target_checks_explicit_versions() {
        let (_dir, quire) = started();
        let site = quire.site().unwrap();
        assert_eq!(quire.target(None, false).unwrap(), Target::Current);
        assert_eq!(quire.target(None, true).unwrap(), Target::Next);
        assert_eq!(
            quire.target(Some(&site.version.to_string()), true).unwrap(),
            Target::Current
        );

        let snapshot = snapshot_staging(&quire);
        assert_eq!(
            quire.target(Some(&snapshot.uid.to_string()), false).unwrap(),
            Target::Version(snapshot.uid)
        );
        assert!(quire
            .target(Some(&Uid::new().to_string()), false)
            .unwrap_err()
            .is_not_found());
        assert_eq!(
            quire.target(Some("nope"), false).unwrap_err().class(),
            ErrorClass::InvalidInput
        );
    }

    #[test]
    fn resolve_page_returns_record() {
        let (_dir, quire) = started();
        let page = quire.resolve_page(&Target::Current, HOME_PATH).unwrap();
        assert_eq!(page.path, HOME_PATH);
    }

    // ---- Concurrent writers ----

    #[test]
    fn staging_write_waits_for_the_writer_lock() {
        let (_dir, quire) = started();
        let staging = quire.site().unwrap().next_version;
        std::thread::scope(|scope| {
            let held = quire.writer.lock();
            let writer = scope.spawn(|| put(&quire, None, "/queued", "q"));
            std::thread::sleep(Duration::from_millis(50));
            assert!(!quire.version(&staging).unwrap().pages.contains_key("/queued"));
            drop(held);
            writer.join().unwrap();
        });
        assert!(quire.resolve(&Target::Next, "/queued").is_ok());
        assert_consistent(&quire);
    }

    #[test]
    fn concurrent_workflows_keep_staging_index_in_sync() {
        let (_dir, quire) = started();
        let shared = put(&quire, None, "/shared", "s").page.uid;

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let quire = &quire;
                scope.spawn(move || {
                    for i in 0..25 {
                        // every worker keeps moving the same page
                        put(quire, Some(shared), &format!("/w{worker}/m{i}"), "s");
                        let own = put(quire, None, &format!("/w{worker}/p{i}"), "x");
                        if i % 3 == 0 {
                            quire.delete_page(&CancelToken::new(), &own.page.uid).unwrap();
                        }
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..25 {
                    quire.reload().unwrap();
                }
            });
        });

        let staging = quire.version_manager().staging().unwrap().to_map();
        assert_eq!(staging.values().filter(|uid| **uid == shared).count(), 1);
        assert_consistent(&quire);
    }

    // ---- Index consistency under arbitrary edits ----

    #[derive(Clone, Debug)]
    enum Op {
        Create { path: usize },
        Update { page: usize, path: usize, content: usize },
        Delete { page: usize },
        Snapshot,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..5usize).prop_map(|path| Op::Create { path }),
            (0..8usize, 0..5usize, 0..3usize)
                .prop_map(|(page, path, content)| Op::Update { page, path, content }),
            (0..8usize).prop_map(|page| Op::Delete { page }),
            Just(Op::Snapshot),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn index_matches_versions_after_any_edit_sequence(ops in prop::collection::vec(op(), 1..16)) {
            let (_dir, quire) = started();
            let home = quire.resolve(&Target::Current, HOME_PATH).unwrap();
            let mut known = vec![home];
            let paths = ["/", "/a", "/b", "/c/d", "/e"];
            let contents = ["x", "y", "z"];

            for op in ops {
                match op {
                    Op::Create { path } => {
                        // collisions are expected and leave no trace
                        if let Ok(out) = quire.put_page(
                            &CancelToken::new(),
                            None,
                            &WritablePage::at(paths[path]),
                            b"new",
                        ) {
                            known.push(out.page.uid);
                        }
                    }
                    Op::Update { page, path, content } => {
                        let uid = known[page % known.len()];
                        if let Ok(out) = quire.put_page(
                            &CancelToken::new(),
                            Some(uid),
                            &WritablePage::at(paths[path]),
                            contents[content].as_bytes(),
                        ) {
                            known.push(out.page.uid);
                        }
                    }
                    Op::Delete { page } => {
                        let _ = quire.delete_page(&CancelToken::new(), &known[page % known.len()]);
                    }
                    Op::Snapshot => {
                        snapshot_staging(&quire);
                    }
                }
                assert_consistent(&quire);
            }

            // published version never changes
            prop_assert_eq!(quire.resolve(&Target::Current, HOME_PATH).unwrap(), home);
        }
    }
}
