//! Persistent record of articles that have already been published.
//!
//! The backing file is newline-delimited article ids, append-only. It is read
//! fully into a set when the store is opened; membership is the only query.

use crate::error::HistoryError;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    ids: HashSet<String>,
}

impl HistoryStore {
    /// Load the history file at `path`.
    ///
    /// A missing file is the first run and yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Read`] for any other I/O failure, since
    /// publishing without a readable history could repost old articles.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();
        let ids = match fs::read_to_string(&path).await {
            Ok(body) => body
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No history file yet; starting empty");
                HashSet::new()
            }
            Err(source) => return Err(HistoryError::Read { path, source }),
        };
        debug!(count = ids.len(), "Loaded history");
        Ok(Self { path, ids })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `id` to the history file and remember it.
    ///
    /// Recording an id twice writes a second line; readers only ever check
    /// membership, so duplicates are harmless.
    #[instrument(level = "info", skip(self))]
    pub async fn record(&mut self, id: &str) -> Result<(), HistoryError> {
        let id = id.trim();
        self.append_line(id)
            .await
            .map_err(|source| HistoryError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.ids.insert(id.to_string());
        info!(count = self.ids.len(), "Recorded article in history");
        Ok(())
    }

    async fn append_line(&self, id: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{id}\n").as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await
    }
}
