use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::input::parse_id_list;

/// Record of which source ids a run has already handled.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    fn contains(&self, id: &str) -> bool;
    async fn record(&mut self, id: &str) -> Result<()>;
}

/// Append-only `.dat` file, one id per line. Loaded once, appended and flushed per record.
pub struct DatFile {
    path: PathBuf,
    ids: HashSet<String>,
}

impl DatFile {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ids = read_id_set(&path).await?;
        Ok(Self { path, ids })
    }

    pub fn path(&self) -> &Path { &self.path }
    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
}

#[async_trait]
impl ProgressStore for DatFile {
    fn contains(&self, id: &str) -> bool { self.ids.contains(id) }

    async fn record(&mut self, id: &str) -> Result<()> {
        append_line(&self.path, id).await?;
        self.ids.insert(id.to_string());
        Ok(())
    }
}

/// Ids from a list file; a missing file yields an empty set.
pub async fn read_id_set(path: &Path) -> Result<HashSet<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(parse_id_list(&text, &path.to_string_lossy())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

pub async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {} for appending", path.display()))?;
    f.write_all(format!("{line}\n").as_bytes()).await?;
    f.flush().await?;
    Ok(())
}

/// Best-effort removal of leftovers from a previous run.
pub async fn remove_stale(paths: &[&Path]) {
    for p in paths {
        let _ = tokio::fs::remove_file(p).await;
    }
}
