//! Bulk YouTube to Amara subtitle sync.
//!
//! Ids already listed in the progress file (or the skip list) are not looked
//! at again, so rerunning on the same input only touches what is missing.
//! Existing visible subtitles are never rewritten and every per-row failure
//! is logged and skipped.

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::amara::{youtube_url, AmaraApi};
use crate::input::InputRow;
use crate::storage::{append_line, ProgressStore};
use crate::youtube::{FetchOutcome, SubtitleFetcher};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub lang: String,
    pub sub_format: String,
    pub original_language: String,
    /// Receives ids whose subtitles YouTube does not have.
    pub failed_file: PathBuf,
}

impl SyncOptions {
    pub fn is_original(&self) -> bool { self.lang == self.original_language }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Listed in the progress or skip file.
    Skipped,
    AlreadyPresent,
    Uploaded,
    NotOnYoutube,
    Failed,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub skipped: usize,
    pub already_present: usize,
    pub uploaded: usize,
    pub not_on_youtube: usize,
    pub failed: usize,
}

impl SyncReport {
    fn add(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::AlreadyPresent => self.already_present += 1,
            RowOutcome::Uploaded => self.uploaded += 1,
            RowOutcome::NotOnYoutube => self.not_on_youtube += 1,
            RowOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct BulkSync<'a> {
    amara: &'a dyn AmaraApi,
    fetcher: &'a dyn SubtitleFetcher,
    progress: &'a mut dyn ProgressStore,
    skip: HashSet<String>,
    opts: SyncOptions,
}

impl<'a> BulkSync<'a> {
    pub fn new(
        amara: &'a dyn AmaraApi,
        fetcher: &'a dyn SubtitleFetcher,
        progress: &'a mut dyn ProgressStore,
        skip: HashSet<String>,
        opts: SyncOptions,
    ) -> Self {
        Self { amara, fetcher, progress, skip, opts }
    }

    pub async fn run(&mut self, rows: &[InputRow]) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for row in rows {
            let outcome = self.sync_row(&row.source_id).await?;
            report.add(outcome);
        }
        tracing::info!(?report, lang = %self.opts.lang, "sync finished");
        Ok(report)
    }

    /// Errors returned from here are local I/O failures; remote failures become `Failed`.
    pub async fn sync_row(&mut self, ytid: &str) -> Result<RowOutcome> {
        if self.progress.contains(ytid) || self.skip.contains(ytid) {
            return Ok(RowOutcome::Skipped);
        }
        let outcome = match self.attempt(ytid).await {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(ytid, "{e:#}");
                RowOutcome::Failed
            }
        };
        match outcome {
            RowOutcome::AlreadyPresent => {
                tracing::debug!(ytid, "subtitles already present");
                self.progress.record(ytid).await?;
            }
            RowOutcome::Uploaded => {
                tracing::info!(ytid, "successfully uploaded subtitles");
                self.progress.record(ytid).await?;
            }
            RowOutcome::NotOnYoutube => {
                tracing::error!(ytid, "requested subtitles were not found on YouTube");
                append_line(&self.opts.failed_file, ytid).await?;
            }
            RowOutcome::Skipped | RowOutcome::Failed => {}
        }
        Ok(outcome)
    }

    async fn attempt(&self, ytid: &str) -> Result<RowOutcome> {
        let lang = self.opts.lang.as_str();
        let url = youtube_url(ytid);

        // The lookup already lists languages, so no separate language check is needed.
        let (amara_id, lang_present) = match self.amara.check_video(&url).await? {
            Some(video) => match video.language(lang) {
                Some(entry) if entry.visible => return Ok(RowOutcome::AlreadyPresent),
                entry => (video.id.clone(), entry.is_some()),
            },
            None => {
                let Some(video) = self.amara.add_video(&url, &self.opts.original_language).await? else {
                    bail!("adding video to Amara returned no id");
                };
                tracing::debug!(ytid, amara_id = %video.id, "created video on Amara");
                (video.id, false)
            }
        };

        let subs = match self.fetcher.fetch(ytid, lang, &self.opts.sub_format).await? {
            FetchOutcome::Downloaded(s) => s,
            FetchOutcome::NotAvailable => return Ok(RowOutcome::NotOnYoutube),
            FetchOutcome::Failed(err) => bail!("downloading subtitles failed: {err}"),
        };

        if !lang_present {
            if let Err(e) = self.amara.add_language(&amara_id, lang, self.opts.is_original()).await {
                tracing::warn!(ytid, %amara_id, error = %e, "adding language failed, uploading anyway");
            }
        }

        let r = self.amara.upload_subs(&amara_id, lang, true, &subs, &self.opts.sub_format).await?;
        if r.version_number.is_none() {
            bail!("uploading subtitles to Amara failed: {}", r.raw);
        }
        Ok(RowOutcome::Uploaded)
    }
}
