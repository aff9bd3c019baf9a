//! Remote filesystem metadata and requests.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::presence::Presence;
use super::string_id;

/// File extensions accepted for upload. Batch uploads skip anything else.
pub const SUPPORTED_FILE_EXTENSIONS: &[&str] =
    &["xyz", "pdb", "sdf", "mol", "mol2", "smi", "json", "csv", "txt"];

/// Whether `path` carries an extension on [`SUPPORTED_FILE_EXTENSIONS`].
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_FILE_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

string_id! {
    /// Server-assigned file or directory identifier.
    FileId
}

/// A node in the remote file tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: FileId,
    pub name: String,
    /// `None` for entries in the root directory.
    #[serde(default)]
    pub parent_id: Option<FileId>,
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes_uncompressed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_uncompressed: Option<String>,
}

/// Body for `POST /v0/files` and one entry of `POST /v0/files/batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFileRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FileId>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_directory: bool,
    /// Base64 file content; absent for directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64data: Option<String>,
}

impl CreateFileRequest {
    /// A file with the given content.
    pub fn file(name: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
            is_directory: false,
            base64data: Some(crate::codec::encode(content)),
        }
    }

    /// An empty directory.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
            is_directory: true,
            base64data: None,
        }
    }

    /// Place the new entry under `parent`.
    pub fn in_directory(mut self, parent: Option<FileId>) -> Self {
        self.parent_id = parent;
        self
    }
}

/// Body for `PATCH /v0/files/{id}`.
///
/// `parent_id: Presence::Null` moves the entry to the root directory;
/// `Presence::Unset` leaves its location unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFileRequest {
    #[serde(default, skip_serializing_if = "Presence::is_unset")]
    pub name: Presence<String>,
    #[serde(default, skip_serializing_if = "Presence::is_unset")]
    pub parent_id: Presence<FileId>,
}

impl UpdateFileRequest {
    /// Rename without moving.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Presence::Value(name.into()),
            parent_id: Presence::Unset,
        }
    }

    /// Move to `parent`, or to the root directory when `None`.
    pub fn reparent(parent: Option<FileId>) -> Self {
        Self {
            name: Presence::Unset,
            parent_id: Presence::from_option(parent),
        }
    }
}

/// Filter for `GET /v0/files`.
///
/// `page` picks the page `list` fetches and the first page `ls`
/// streams; unset means page 1. `list_all` always walks from page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFileParams {
    /// List only the children of this directory.
    pub parent_id: Option<FileId>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub size: u32,
}

impl Default for ListFileParams {
    fn default() -> Self {
        Self {
            parent_id: None,
            search: None,
            page: None,
            size: 10,
        }
    }
}

impl ListFileParams {
    /// Children of `parent`.
    pub fn in_directory(parent: FileId) -> Self {
        Self {
            parent_id: Some(parent),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub(crate) fn filter_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(parent) = &self.parent_id {
            query.push(("parent_id", parent.to_string()));
        }
        if let Some(search) = &self.search {
            query.push(("search", search.clone()));
        }
        query
    }
}
