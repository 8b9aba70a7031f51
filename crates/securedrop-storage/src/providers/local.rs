//! Local filesystem storage provider.
//!
//! Every path handed in is joined to the root, canonicalized and checked to
//! still live under the canonical root before any I/O happens. Symlinks are
//! followed by canonicalization, so a link pointing outside the root is
//! reported as a path violation rather than served.

use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use uuid::Uuid;

use securedrop_core::error::{AppError, ErrorKind};
use securedrop_core::result::AppResult;
use securedrop_core::traits::storage::{
    ByteStream, StorageObjectMeta, StorageProvider, StoredObject, WriteMode,
};

/// Default read buffer for streamed downloads.
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound on `{stem}_{n}{ext}` probes before giving up.
const MAX_RENAME_ATTEMPTS: u32 = 10_000;

/// Local filesystem storage provider confined to a single root.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Canonical root directory for all stored files.
    root: PathBuf,
    /// Read buffer size for streams.
    chunk_size: usize,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        let root = fs::canonicalize(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to resolve storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Override the read buffer used by [`StorageProvider::read_range`].
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `dir` to a canonical directory inside the root.
    ///
    /// Components are walked one at a time so that a symlink pointing
    /// outside the root is caught before anything is created through it.
    /// With `create` missing directories are created; otherwise a missing
    /// directory yields `Ok(None)`.
    async fn resolve_dir(&self, dir: &str, create: bool) -> AppResult<Option<PathBuf>> {
        check_relative_dir(dir)?;

        let mut current = self.root.clone();
        for component in Path::new(dir).components() {
            let Component::Normal(part) = component else {
                continue;
            };
            let next = current.join(part);
            match fs::canonicalize(&next).await {
                Ok(canonical) => current = canonical,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    if !create {
                        return Ok(None);
                    }
                    if let Err(e) = fs::create_dir(&next).await {
                        if e.kind() != std::io::ErrorKind::AlreadyExists {
                            return Err(AppError::with_source(
                                ErrorKind::Storage,
                                format!("Failed to create directory: {dir}"),
                                e,
                            ));
                        }
                    }
                    current = fs::canonicalize(&next).await.map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Storage,
                            format!("Failed to resolve directory: {dir}"),
                            e,
                        )
                    })?;
                }
                Err(e) => {
                    return Err(AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to resolve directory: {dir}"),
                        e,
                    ));
                }
            }
            self.ensure_inside(&current, dir)?;
        }

        Ok(Some(current))
    }

    /// Resolve `name` under `dir` to an existing regular file inside the root.
    async fn resolve_file(&self, dir: &str, name: &str) -> AppResult<PathBuf> {
        check_file_name(name)?;
        let dir_path = self
            .resolve_dir(dir, false)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File not found: {name}")))?;

        let canonical = fs::canonicalize(dir_path.join(name)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("File not found: {name}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to resolve file: {name}"),
                    e,
                )
            }
        })?;

        // A symlink may point at another directory inside the root; the
        // file must stay under the directory it was requested from.
        if !canonical.starts_with(&dir_path) {
            return Err(AppError::path_violation(format!(
                "'{name}' resolves outside its directory"
            )));
        }
        Ok(canonical)
    }

    fn ensure_inside(&self, canonical: &Path, requested: &str) -> AppResult<()> {
        if canonical.starts_with(&self.root) {
            Ok(())
        } else {
            Err(AppError::path_violation(format!(
                "'{requested}' resolves outside the storage root"
            )))
        }
    }

    async fn list_entries(&self, dir: &str, directories: bool) -> AppResult<Vec<StorageObjectMeta>> {
        let Some(dir_path) = self.resolve_dir(dir, false).await? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&dir_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to list directory: {dir}"),
                e,
            )
        })?;

        while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to read directory entry", e)
        })? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            // Follow links, then drop anything that lands outside the listed dir.
            let Ok(canonical) = fs::canonicalize(entry.path()).await else {
                continue;
            };
            if !canonical.starts_with(&dir_path) {
                continue;
            }
            let Ok(meta) = fs::metadata(&canonical).await else {
                continue;
            };

            if directories && meta.is_dir() {
                entries.push(object_meta(name, &meta));
            } else if !directories && meta.is_file() {
                entries.push(object_meta(name, &meta));
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn publish(
        &self,
        temp: &Path,
        dir_path: &Path,
        name: &str,
        mode: WriteMode,
    ) -> AppResult<(String, bool)> {
        match mode {
            WriteMode::Overwrite => {
                fs::rename(temp, dir_path.join(name)).await.map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to publish file: {name}"),
                        e,
                    )
                })?;
                Ok((name.to_string(), false))
            }
            WriteMode::CreateNew => {
                link_new(temp, &dir_path.join(name)).await?.ok_or_else(|| {
                    AppError::conflict(format!("File '{name}' already exists"))
                })?;
                Ok((name.to_string(), false))
            }
            WriteMode::Rename => {
                if link_new(temp, &dir_path.join(name)).await?.is_some() {
                    return Ok((name.to_string(), false));
                }
                let (stem, ext) = split_name(name);
                for n in 1..=MAX_RENAME_ATTEMPTS {
                    let candidate = format!("{stem}_{n}{ext}");
                    if link_new(temp, &dir_path.join(&candidate)).await?.is_some() {
                        return Ok((candidate, true));
                    }
                }
                Err(AppError::conflict(format!(
                    "No free name available for '{name}'"
                )))
            }
        }
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn list_files(&self, dir: &str) -> AppResult<Vec<StorageObjectMeta>> {
        self.list_entries(dir, false).await
    }

    async fn list_dirs(&self, dir: &str) -> AppResult<Vec<StorageObjectMeta>> {
        self.list_entries(dir, true).await
    }

    async fn metadata(&self, dir: &str, name: &str) -> AppResult<StorageObjectMeta> {
        let path = self.resolve_file(dir, name).await?;
        let meta = fs::metadata(&path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to get metadata: {name}"),
                e,
            )
        })?;
        if !meta.is_file() {
            return Err(AppError::not_found(format!("File not found: {name}")));
        }
        Ok(object_meta(name.to_string(), &meta))
    }

    async fn read_range(
        &self,
        dir: &str,
        name: &str,
        offset: u64,
        length: u64,
    ) -> AppResult<ByteStream> {
        let path = self.resolve_file(dir, name).await?;
        let mut file = fs::File::open(&path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to open file: {name}"), e)
        })?;

        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, format!("Failed to seek: {name}"), e)
            })?;
        }

        Ok(Box::pin(ReaderStream::with_capacity(
            file.take(length),
            self.chunk_size,
        )))
    }

    async fn write(
        &self,
        dir: &str,
        name: &str,
        data: Bytes,
        mode: WriteMode,
    ) -> AppResult<StoredObject> {
        check_file_name(name)?;
        let dir_path = self
            .resolve_dir(dir, true)
            .await?
            .ok_or_else(|| AppError::storage(format!("Directory vanished: {dir}")))?;

        if mode == WriteMode::CreateNew && fs::symlink_metadata(dir_path.join(name)).await.is_ok() {
            return Err(AppError::conflict(format!("File '{name}' already exists")));
        }

        let temp = dir_path.join(format!(".{name}.{}.part", Uuid::new_v4().simple()));
        let result = async {
            write_temp(&temp, &data).await?;
            self.publish(&temp, &dir_path, name, mode).await
        }
        .await;

        if let Err(e) = fs::remove_file(&temp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %temp.display(), error = %e, "Failed to remove temporary upload");
            }
        }

        let (stored_name, renamed) = result?;
        debug!(dir, name = %stored_name, bytes = data.len(), renamed, "Stored file");
        Ok(StoredObject {
            name: stored_name,
            size_bytes: data.len() as u64,
            renamed,
        })
    }
}

async fn write_temp(temp: &Path, data: &[u8]) -> AppResult<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to create temp file", e))?;
    file.write_all(data)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to write temp file", e))?;
    file.sync_all()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush temp file", e))?;
    Ok(())
}

/// Hard-link `temp` to `target` unless `target` exists. `None` means taken.
async fn link_new(temp: &Path, target: &Path) -> AppResult<Option<()>> {
    match fs::hard_link(temp, target).await {
        Ok(()) => Ok(Some(())),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to publish file: {}", target.display()),
            e,
        )),
    }
}

/// `"report.tar.gz"` splits into `("report.tar", ".gz")`.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn check_relative_dir(dir: &str) -> AppResult<()> {
    if dir.contains('\0') || dir.contains('\\') {
        return Err(AppError::path_violation(format!(
            "Directory '{dir}' contains forbidden characters"
        )));
    }
    for component in Path::new(dir).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(AppError::path_violation(format!(
                    "Directory '{dir}' escapes the storage root"
                )));
            }
        }
    }
    Ok(())
}

/// A file name must be exactly one normal path component.
pub fn check_file_name(name: &str) -> AppResult<()> {
    if name.is_empty() || name.contains('\0') || name.contains('\\') || name.contains('/') {
        return Err(AppError::path_violation(format!("Invalid file name '{name}'")));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(AppError::path_violation(format!("Invalid file name '{name}'"))),
    }
}

fn object_meta(name: String, meta: &std::fs::Metadata) -> StorageObjectMeta {
    let modified_at = meta.modified().ok().map(DateTime::<Utc>::from);
    let mime_type = if meta.is_file() {
        mime_from_path(&name)
    } else {
        None
    };
    StorageObjectMeta {
        name,
        size_bytes: if meta.is_file() { meta.len() } else { 0 },
        mime_type,
        modified_at,
        is_directory: meta.is_dir(),
    }
}

/// Guess MIME type from a file path extension.
pub fn mime_from_path(path: &str) -> Option<String> {
    let (_, ext) = path.rsplit_once('.')?;
    let mime = match ext.to_lowercase().as_str() {
        "txt" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => return None,
    };
    Some(mime.to_string())
}
