use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::amara::youtube_url;
use crate::config::YoutubeConfig;

const WRITING_MARKER: &str = "Writing video subtitles to: ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded(String),
    /// YouTube has no subtitles in the requested language.
    NotAvailable,
    /// The downloader reported an error on stderr.
    Failed(String),
}

#[async_trait]
pub trait SubtitleFetcher: Send + Sync {
    async fn fetch(&self, ytid: &str, lang: &str, sub_format: &str) -> Result<FetchOutcome>;
}

/// Runs an external youtube-dl compatible program with `--skip-download`.
pub struct YoutubeDl {
    cfg: YoutubeConfig,
}

impl YoutubeDl {
    pub fn new(cfg: YoutubeConfig) -> Self { Self { cfg } }

    pub fn args(lang: &str, sub_format: &str, ytid: &str) -> Vec<String> {
        vec![
            "--sub-lang".into(), lang.into(),
            "--sub-format".into(), sub_format.into(),
            "--write-sub".into(),
            "--skip-download".into(),
            youtube_url(ytid),
        ]
    }

    pub async fn prepare(&self) -> Result<()> {
        crate::storage::remove_stale(&[self.cfg.stdout_log.as_path(), self.cfg.stderr_log.as_path()]).await;
        tokio::fs::create_dir_all(&self.cfg.subs_dir)
            .await
            .with_context(|| format!("creating subtitles dir: {}", self.cfg.subs_dir.display()))
    }
}

#[async_trait]
impl SubtitleFetcher for YoutubeDl {
    async fn fetch(&self, ytid: &str, lang: &str, sub_format: &str) -> Result<FetchOutcome> {
        let output = tokio::process::Command::new(&self.cfg.program)
            .args(Self::args(lang, sub_format, ytid))
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.cfg.program))?;
        let out = String::from_utf8_lossy(&output.stdout);
        let err = String::from_utf8_lossy(&output.stderr);
        append(&self.cfg.stdout_log, &out).await?;
        if !err.trim().is_empty() {
            append(&self.cfg.stderr_log, &err).await?;
            return Ok(FetchOutcome::Failed(err.trim().to_string()));
        }
        let Some(fname) = written_file(&out) else { return Ok(FetchOutcome::NotAvailable) };
        let subs = tokio::fs::read_to_string(&fname)
            .await
            .with_context(|| format!("reading downloaded subtitles: {fname}"))?;
        let keep: PathBuf = self.cfg.subs_dir.join(Path::new(&fname).file_name().unwrap_or_default());
        if let Err(e) = tokio::fs::rename(&fname, &keep).await {
            tracing::warn!(file = %fname, error = %e, "could not move subtitles into {}", self.cfg.subs_dir.display());
        }
        Ok(FetchOutcome::Downloaded(subs))
    }
}

/// Filename the downloader reports writing, if any.
pub fn written_file(stdout: &str) -> Option<String> {
    let (_, rest) = stdout.split_once(WRITING_MARKER)?;
    let name = rest.lines().next()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}

async fn append(path: &Path, text: &str) -> Result<()> {
    if text.is_empty() { return Ok(()); }
    let mut f = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
    f.write_all(text.as_bytes()).await?;
    Ok(())
}
