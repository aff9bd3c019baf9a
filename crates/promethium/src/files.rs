//! File resource client.
//!
//! A thin projection of the remote file tree: nothing is cached, every call
//! is one request. Cycles are rejected by the server.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::Stream;
use tracing::{debug, instrument};

use crate::error::{PromethiumError, PromethiumResult};
use crate::http::{Connection, Resource};
use crate::models::{
    CreateFileRequest, FileId, FileMetadata, ListFileParams, UpdateFileRequest,
    is_supported_extension,
};
use crate::page::{Page, PageSource, Paginator};

const FILES_PATH: &str = "/v0/files";

/// Browse and modify the remote file tree.
#[derive(Debug, Clone)]
pub struct Files {
    conn: Connection,
}

impl Files {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    // ─── Reading ────────────────────────────────────────────────────

    /// Metadata for a file or directory.
    #[instrument(skip(self))]
    pub async fn metadata(&self, id: &FileId) -> PromethiumResult<FileMetadata> {
        let path = format!("{FILES_PATH}/{id}");
        self.conn
            .json(self.conn.get(&path), Resource::File, id.as_str())
            .await
    }

    /// Raw content of a file; a directory downloads as a ZIP archive.
    #[instrument(skip(self))]
    pub async fn download(&self, id: &FileId) -> PromethiumResult<Vec<u8>> {
        let path = format!("{FILES_PATH}/{id}/download");
        self.conn
            .bytes(self.conn.get(&path), Resource::File, id.as_str())
            .await
    }

    /// Paginator over files matching `params`.
    pub fn paginator(&self, params: &ListFileParams) -> PromethiumResult<Paginator<FilePages>> {
        Paginator::new(
            FilePages {
                conn: self.conn.clone(),
                filter: params.filter_query(),
            },
            params.size,
        )
    }

    /// One page: `params.page`, or page 1 when unset.
    pub async fn list(&self, params: &ListFileParams) -> PromethiumResult<Page<FileMetadata>> {
        self.paginator(params)?
            .fetch(params.page.unwrap_or(1))
            .await
    }

    /// Lazy stream of listing pages from `params.page` (page 1 when unset)
    /// to the last.
    pub fn ls(
        &self,
        params: &ListFileParams,
    ) -> PromethiumResult<impl Stream<Item = PromethiumResult<Page<FileMetadata>>> + Send + 'static>
    {
        Ok(self
            .paginator(params)?
            .into_pages_from(params.page.unwrap_or(1)))
    }

    /// Every matching entry, walking all pages from page 1. `params.page`
    /// is ignored.
    pub async fn list_all(&self, params: &ListFileParams) -> PromethiumResult<Vec<FileMetadata>> {
        self.paginator(params)?.collect_all().await
    }

    // ─── Writing ────────────────────────────────────────────────────

    /// Create one file or directory.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: &CreateFileRequest) -> PromethiumResult<FileMetadata> {
        self.conn
            .send_json(self.conn.post(FILES_PATH), request, Resource::File, &request.name)
            .await
    }

    /// Create several entries in one request.
    ///
    /// Files whose extension is not supported are dropped before sending;
    /// directories always pass. Nothing is sent when no entry remains.
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub async fn create_batch(
        &self,
        requests: &[CreateFileRequest],
    ) -> PromethiumResult<Vec<FileMetadata>> {
        let accepted: Vec<&CreateFileRequest> = requests
            .iter()
            .filter(|request| {
                let keep = request.is_directory || is_supported_extension(Path::new(&request.name));
                if !keep {
                    debug!("Dropping unsupported file {} from batch", request.name);
                }
                keep
            })
            .collect();
        if accepted.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!("{FILES_PATH}/batch");
        self.conn
            .send_json(self.conn.post(&path), &accepted, Resource::File, &path)
            .await
    }

    /// Rename or reparent an entry.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: &FileId,
        update: &UpdateFileRequest,
    ) -> PromethiumResult<FileMetadata> {
        let path = format!("{FILES_PATH}/{id}");
        self.conn
            .send_json(self.conn.patch(&path), update, Resource::File, id.as_str())
            .await
    }

    /// Move an entry into `parent`, or to the root directory when `None`.
    pub async fn mv(&self, id: &FileId, parent: Option<&FileId>) -> PromethiumResult<FileMetadata> {
        if parent == Some(id) {
            return Err(PromethiumError::InvalidArgument(format!(
                "cannot move {id} into itself"
            )));
        }
        self.update(id, &UpdateFileRequest::reparent(parent.cloned()))
            .await
    }

    /// Create a directory under `parent`, or in the root directory.
    pub async fn mkdir(&self, name: &str, parent: Option<&FileId>) -> PromethiumResult<FileMetadata> {
        self.create(&CreateFileRequest::directory(name).in_directory(parent.cloned()))
            .await
    }

    /// Delete a file or directory.
    #[instrument(skip(self))]
    pub async fn rm(&self, id: &FileId) -> PromethiumResult<()> {
        let path = format!("{FILES_PATH}/{id}");
        self.conn
            .empty(self.conn.delete(&path), Resource::File, id.as_str())
            .await
    }

    // ─── Local transfers ────────────────────────────────────────────

    /// Upload a local file, or the supported files directly inside a local
    /// directory.
    ///
    /// Directory uploads are not recursive. Files whose extension is not
    /// supported are skipped and logged at debug level.
    #[instrument(skip(self))]
    pub async fn upload_path(
        &self,
        local: &Path,
        parent: Option<&FileId>,
    ) -> PromethiumResult<Vec<FileMetadata>> {
        let meta = tokio::fs::metadata(local).await?;
        if meta.is_file() {
            let request = read_upload(local).await?.in_directory(parent.cloned());
            return Ok(vec![self.create(&request).await?]);
        }

        let mut requests = Vec::new();
        let mut entries = tokio::fs::read_dir(local).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if !is_supported_extension(&path) {
                debug!("Skipping unsupported file {}", path.display());
                continue;
            }
            requests.push(read_upload(&path).await?.in_directory(parent.cloned()));
        }
        requests.sort_by(|a, b| a.name.cmp(&b.name));
        self.create_batch(&requests).await
    }

    /// Download an entry into `dir`, returning the written path.
    ///
    /// Files keep their remote name; directories are written as `<name>.zip`.
    #[instrument(skip(self))]
    pub async fn download_to(&self, id: &FileId, dir: &Path) -> PromethiumResult<PathBuf> {
        let meta = self.metadata(id).await?;
        let bytes = self.download(id).await?;
        let name = if meta.is_directory {
            format!("{}.zip", meta.name)
        } else {
            meta.name
        };
        let target = dir.join(sanitize_name(&name)?);
        tokio::fs::write(&target, &bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(target)
    }
}

async fn read_upload(path: &Path) -> PromethiumResult<CreateFileRequest> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            PromethiumError::InvalidArgument(format!("{} has no usable file name", path.display()))
        })?
        .to_string();
    let content = tokio::fs::read(path).await?;
    Ok(CreateFileRequest::file(name, content))
}

/// Reject remote names that would escape the target directory.
fn sanitize_name(name: &str) -> PromethiumResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\')
    {
        return Err(PromethiumError::InvalidArgument(format!(
            "remote name '{name}' is not a valid local file name"
        )));
    }
    Ok(trimmed)
}

/// `GET /v0/files` as a [`PageSource`].
#[derive(Debug, Clone)]
pub struct FilePages {
    conn: Connection,
    filter: Vec<(&'static str, String)>,
}

#[async_trait]
impl PageSource for FilePages {
    type Item = FileMetadata;

    async fn fetch_page(&self, page: u32, size: u32) -> PromethiumResult<Page<FileMetadata>> {
        let request = self
            .conn
            .get(FILES_PATH)
            .query(&self.filter)
            .query(&[("page", page), ("size", size)]);
        self.conn.json(request, Resource::File, FILES_PATH).await
    }
}
