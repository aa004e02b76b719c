//! Persisted records.
//!
//! Records are stored whole: callers read, modify, and save. Field names use
//! camelCase on the wire.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::uid::Uid;

/// The singleton site record.
///
/// `version` is the published version served to readers; `next_version` is
/// the staging version that accumulates edits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub uid: Uid,
    pub title: String,
    pub version: Uid,
    pub next_version: Uid,
}

/// A snapshot mapping URL paths to page ids, plus the theme used to render
/// them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub uid: Uid,
    pub pages: BTreeMap<String, Uid>,
    pub theme: Uid,
}

impl Version {
    /// Distinct page ids referenced by this version.
    pub fn page_uids(&self) -> BTreeSet<Uid> {
        self.pages.values().copied().collect()
    }

    /// Returns `true` if any path in this version points at `page`.
    pub fn references(&self, page: &Uid) -> bool {
        self.pages.values().any(|p| p == page)
    }

    /// The path bound to `page`, if any.
    pub fn path_of(&self, page: &Uid) -> Option<&str> {
        self.pages
            .iter()
            .find(|(_, uid)| *uid == page)
            .map(|(path, _)| path.as_str())
    }
}

/// A page: metadata plus a pointer to its content blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub uid: Uid,
    pub title: String,
    pub path: String,
    pub content: Uid,
    pub template_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub excerpt: String,
}

impl Page {
    /// Build a page record from caller-supplied fields.
    pub fn from_writable(uid: Uid, write: &WritablePage, content: Uid) -> Self {
        Self {
            uid,
            title: write.title.clone(),
            path: write.path.clone(),
            content,
            template_name: write.template_name.clone(),
            tags: write.tags.clone(),
            excerpt: write.excerpt.clone(),
        }
    }
}

/// The fields of a [`Page`] a caller may set directly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritablePage {
    #[serde(default)]
    pub title: String,
    pub path: String,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub excerpt: String,
}

impl WritablePage {
    /// A writable page with only a path set.
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_template(mut self, template_name: impl Into<String>) -> Self {
        self.template_name = template_name.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Metadata for a stored byte sequence. The bytes live outside the document
/// store, keyed by `uid`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub uid: Uid,
    pub hash: ContentHash,
}

impl Blob {
    /// Compare `candidate` against the stored digest without touching the
    /// stored bytes.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        self.hash.verify(candidate)
    }
}

/// Templates and static assets, all referenced by blob id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub uid: Uid,
    pub templates: BTreeMap<String, Uid>,
    #[serde(default)]
    pub css_assets: Vec<Uid>,
    #[serde(default)]
    pub js_assets: Vec<Uid>,
}
