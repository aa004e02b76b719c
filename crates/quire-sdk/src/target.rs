use std::fmt;

use quire_types::{Site, Uid};

use crate::error::{SdkError, SdkResult};

/// Keyword selecting the staging version.
pub const NEXT_KEYWORD: &str = "next";

/// Which version a lookup runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// The published version.
    Current,
    /// The staging version.
    Next,
    /// Any other version, read straight from the store.
    Version(Uid),
}

impl Target {
    /// Interpret a caller's version selector against the site.
    ///
    /// No selector means the published version for reads and the staging
    /// version for writes. `"next"` or the staging uid select staging; the
    /// published uid selects current. Any other uid is returned as
    /// [`Target::Version`] and still has to be checked for existence by the
    /// caller.
    pub fn select(selector: Option<&str>, site: &Site, write: bool) -> SdkResult<Self> {
        let Some(raw) = selector else {
            return Ok(if write { Self::Next } else { Self::Current });
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid_selector(raw));
        }
        if raw == NEXT_KEYWORD {
            return Ok(Self::Next);
        }
        let uid = Uid::parse(raw).map_err(|_| invalid_selector(raw))?;
        Ok(if uid == site.next_version {
            Self::Next
        } else if uid == site.version {
            Self::Current
        } else {
            Self::Version(uid)
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Next => f.write_str(NEXT_KEYWORD),
            Self::Version(uid) => write!(f, "{uid}"),
        }
    }
}

fn invalid_selector(raw: &str) -> SdkError {
    SdkError::InvalidVersion(format!(
        "{raw:?}: specify either \"{NEXT_KEYWORD}\" or a version uid"
    ))
}
