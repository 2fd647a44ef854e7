//! Hands files to the backend's indexing pipeline.

use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use log::{info, warn};
use walkdir::WalkDir;

use crate::dispatch::Dispatch;
use crate::dispatch::decode;
use crate::dispatch::models::UploadResponse;
use crate::error::{ConsoleError, ConsoleResult};

/// Files read and uploaded at the same time by [`index_dir`].
pub const UPLOAD_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    /// Name the backend stored the file under.
    pub name: String,
}

/// Outcome of a batch upload; one failing file does not stop the others.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub indexed: Vec<IndexedFile>,
    pub failed: Vec<(PathBuf, ConsoleError)>,
}

impl IngestSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub async fn index_file(dispatcher: &dyn Dispatch, path: &Path) -> ConsoleResult<IndexedFile> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        ConsoleError::Validation(format!("cannot read {}: {err}", path.display()))
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ConsoleError::Validation(format!("{} is not a file", path.display())))?;

    let body = dispatcher.upload(file_name, bytes).await?;
    let response: UploadResponse = decode(body)?;
    info!("Indexed {} as {}", path.display(), response.filename);
    Ok(IndexedFile {
        name: response.filename,
    })
}

/// Uploads every regular file under `dir`, at most [`UPLOAD_CONCURRENCY`]
/// at a time.
pub async fn index_dir(dispatcher: &dyn Dispatch, dir: &Path) -> ConsoleResult<IngestSummary> {
    if !dir.is_dir() {
        return Err(ConsoleError::Validation(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();

    let results: Vec<(PathBuf, ConsoleResult<IndexedFile>)> = stream::iter(paths)
        .map(|path| async move {
            let result = index_file(dispatcher, &path).await;
            (path, result)
        })
        .buffer_unordered(UPLOAD_CONCURRENCY)
        .collect()
        .await;

    let mut summary = IngestSummary::default();
    for (path, result) in results {
        match result {
            Ok(file) => summary.indexed.push(file),
            Err(err) => {
                warn!("Failed to index {}: {err}", path.display());
                summary.failed.push((path, err));
            }
        }
    }
    Ok(summary)
}
