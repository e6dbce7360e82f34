//! Typed ID wrappers providing compile-time safety for identifiers.
//!
//! [`FileId`] wraps the catalog's autoincrement row id, which SQLite never
//! reuses. [`UploadId`] tags a single in-flight upload for event correlation
//! and never reaches the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a catalog file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(i64);

impl FileId {
    /// Return the raw row id.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for FileId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<FileId> for i64 {
    fn from(id: FileId) -> Self {
        id.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

/// Identifier of one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(Uuid);

impl UploadId {
    /// Create a new random ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_parse_and_display() {
        let id: FileId = "17".parse().unwrap();
        assert_eq!(id.get(), 17);
        assert_eq!(id.to_string(), "17");
    }

    #[test]
    fn file_id_rejects_garbage() {
        assert!("abc".parse::<FileId>().is_err());
        assert!("".parse::<FileId>().is_err());
    }

    #[test]
    fn file_id_serde_transparent() {
        let json = serde_json::to_string(&FileId::from(5)).unwrap();
        assert_eq!(json, "5");
        let back: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FileId::from(5));
    }

    #[test]
    fn upload_ids_are_unique() {
        assert_ne!(UploadId::new(), UploadId::new());
    }
}
