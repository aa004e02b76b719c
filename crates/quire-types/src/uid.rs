use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier for every Quire entity (UUID v7).
///
/// UUID v7 leads with a millisecond timestamp and is monotonic within a
/// process, so both the raw bytes and the canonical string form sort by
/// creation time. Storage keys use [`Uid::key`] and rely on that ordering for
/// cursor-based listing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(uuid::Uuid);

impl Uid {
    /// Generate a new time-ordered identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Canonical storage key: lowercase hyphenated form.
    pub fn key(&self) -> String {
        self.0.hyphenated().to_string()
    }

    /// Short representation (first 8 characters).
    pub fn short_id(&self) -> String {
        self.key()[..8].to_string()
    }

    /// Parse a storage key or user-supplied identifier.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let uuid = uuid::Uuid::parse_str(input.trim()).map_err(|e| TypeError::InvalidUid {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(uuid))
    }
}

impl Default for Uid {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for Uid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self.short_id())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
