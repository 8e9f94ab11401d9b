//! Archiving of the outputs of earlier runs.

use crate::layout::{timestamp, OutputLayout};
use aoma_core::CoreError;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Prefix of archive folder names
pub const ARCHIVE_PREFIX: &str = "run_";

/// File extensions moved into an archive
const ARCHIVED_EXTENSIONS: [&str; 2] = ["json", "md"];

/// Archive errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Filesystem failure
    #[error("Archive I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Name that does not denote an archive folder
    #[error("Invalid archive name: {0}")]
    InvalidName(String),
}

impl From<ArchiveError> for CoreError {
    fn from(err: ArchiveError) -> Self {
        CoreError::StateStoreError(err.to_string())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Summary of one archive folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInfo {
    /// Folder name, `run_<timestamp>`
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Number of archived step results
    pub reports_count: usize,
    /// Number of archived rendered reports
    pub rendered_count: usize,
    /// All archived files
    pub total_files: usize,
}

/// Moves the latest outputs aside before a new full run
#[derive(Debug, Clone)]
pub struct ArchiveManager {
    layout: OutputLayout,
}

impl ArchiveManager {
    /// Manager for the outputs below `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            layout: OutputLayout::new(root),
        }
    }

    /// Move every report file into `archives/run_<timestamp>/reports`.
    ///
    /// Returns the archive folder, or `None` when there was nothing to archive.
    pub async fn archive_previous_run(&self, run_timestamp: Option<&str>) -> Result<Option<PathBuf>, ArchiveError> {
        let reports_dir = self.layout.reports_dir();
        let files = list_files(&reports_dir, &ARCHIVED_EXTENSIONS).await?;
        if files.is_empty() {
            info!("No previous files to archive");
            return Ok(None);
        }

        let stamp = run_timestamp.map(str::to_string).unwrap_or_else(|| timestamp(Utc::now()));
        let folder = self.layout.archives_dir().join(format!("{}{}", ARCHIVE_PREFIX, stamp));
        let target = folder.join("reports");
        tokio::fs::create_dir_all(&target).await.map_err(io_error(&target))?;

        for file in &files {
            let Some(name) = file.file_name() else { continue };
            let dest = target.join(name);
            tokio::fs::rename(file, &dest).await.map_err(io_error(file))?;
            debug!(file = %dest.display(), "Archived");
        }

        info!(files = files.len(), archive = %folder.display(), "Archived previous run");
        Ok(Some(folder))
    }

    /// Keep the newest `keep_last_n` archives and delete the rest.
    ///
    /// Returns the number of archives deleted.
    pub async fn clean_old_archives(&self, keep_last_n: usize) -> Result<usize, ArchiveError> {
        let archives = self.list_archives().await?;
        if archives.len() <= keep_last_n {
            debug!(archives = archives.len(), limit = keep_last_n, "Keeping all archives");
            return Ok(0);
        }

        let to_delete = &archives[..archives.len() - keep_last_n];
        for name in to_delete {
            let path = self.layout.archives_dir().join(name);
            tokio::fs::remove_dir_all(&path).await.map_err(io_error(&path))?;
            info!(archive = %name, "Deleted old archive");
        }
        Ok(to_delete.len())
    }

    /// Archive folder names, oldest first
    pub async fn list_archives(&self) -> Result<Vec<String>, ArchiveError> {
        let dir = self.layout.archives_dir();
        if !exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_error(&dir))?;
        while let Some(entry) = entries.next_entry().await.map_err(io_error(&dir))? {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && name.starts_with(ARCHIVE_PREFIX) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Details of one archive, `None` if it does not exist
    pub async fn archive_info(&self, name: &str) -> Result<Option<ArchiveInfo>, ArchiveError> {
        if !name.starts_with(ARCHIVE_PREFIX) || name.contains(['/', '\\']) || name.contains("..") {
            return Err(ArchiveError::InvalidName(name.to_string()));
        }

        let path = self.layout.archives_dir().join(name);
        if !exists(&path).await? {
            return Ok(None);
        }

        let reports = path.join("reports");
        let reports_count = list_files(&reports, &["json"]).await?.len();
        let rendered_count = list_files(&reports, &["md"]).await?.len();

        Ok(Some(ArchiveInfo {
            name: name.to_string(),
            path,
            reports_count,
            rendered_count,
            total_files: reports_count + rendered_count,
        }))
    }
}

async fn exists(path: &Path) -> Result<bool, ArchiveError> {
    tokio::fs::try_exists(path).await.map_err(io_error(path))
}

/// Files directly in `dir` with one of the extensions, sorted by name
async fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, ArchiveError> {
    if !exists(dir).await? {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error(dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error(dir))? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.contains(&e))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
