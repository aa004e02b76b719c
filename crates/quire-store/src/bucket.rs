//! Named regions of the database.

use redb::TableDefinition;

/// Raw table layout shared by every bucket: string keys, encoded documents.
pub type RawTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// A named region of the database. Each maps to one redb table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Holds the site singleton under [`SITE_KEY`].
    App,
    Themes,
    Pages,
    Versions,
    Blobs,
    /// Reverse index nested under `index`: page uid -> set of version uids.
    PageVersions,
}

/// Key of the site singleton inside [`Bucket::App`].
pub const SITE_KEY: &str = "site";

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Bucket::App,
        Bucket::Themes,
        Bucket::Pages,
        Bucket::Versions,
        Bucket::Blobs,
        Bucket::PageVersions,
    ];

    /// Table name. redb tables are flat, so nesting is spelled with `/`.
    pub const fn name(self) -> &'static str {
        match self {
            Bucket::App => "app",
            Bucket::Themes => "themes",
            Bucket::Pages => "pages",
            Bucket::Versions => "versions",
            Bucket::Blobs => "blobs",
            Bucket::PageVersions => "index/page-versions",
        }
    }

    pub const fn definition(self) -> RawTable {
        TableDefinition::new(self.name())
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
