//! Per-video subtitle upload with a choice of subtitle source.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use thiserror::Error;

use crate::amara::{video_page, youtube_url, AmaraApi, Video};
use crate::input::InputRow;
use crate::prompt::{Prompter, RewritePolicy};
use crate::storage::append_line;
use crate::youtube::{FetchOutcome, SubtitleFetcher};

/// Where the subtitles come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `YTID FILENAME` rows; subtitles read from local files.
    Files,
    /// `YTID` rows; subtitles downloaded from YouTube.
    Youtube,
    /// `YTID_FROM YTID_TO` rows; subtitles copied between two Amara videos.
    Amara,
}

impl Mode {
    fn needs_second_column(self) -> bool { !matches!(self, Mode::Youtube) }
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub mode: Mode,
    pub lang: String,
    pub sub_format: String,
    pub original_language: String,
    pub skip_errors: bool,
    pub rewrite: RewritePolicy,
    pub failed_file: PathBuf,
    pub site_url: String,
}

/// Stops the whole run rather than the current row.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Abort(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Uploaded,
    /// Target already has a revision and the rewrite policy said no.
    KeptExisting,
    /// Operator declined to proceed with this row.
    Declined,
    NotOnYoutube,
    Failed,
}

/// Rows missing the column their mode requires make the input unusable.
pub fn validate_rows(mode: Mode, rows: &[InputRow]) -> Result<()> {
    if !mode.needs_second_column() { return Ok(()); }
    if let Some(bad) = rows.iter().find(|r| r.target.is_none()) {
        bail!("input row `{}` is missing the second column required by {:?} mode", bad.source_id, mode);
    }
    Ok(())
}

pub struct ModalUpload<'a> {
    amara: &'a dyn AmaraApi,
    fetcher: &'a dyn SubtitleFetcher,
    prompter: &'a dyn Prompter,
    opts: UploadOptions,
}

impl<'a> ModalUpload<'a> {
    pub fn new(amara: &'a dyn AmaraApi, fetcher: &'a dyn SubtitleFetcher, prompter: &'a dyn Prompter, opts: UploadOptions) -> Self {
        Self { amara, fetcher, prompter, opts }
    }

    pub async fn run(&self, rows: &[InputRow]) -> Result<Vec<RowOutcome>> {
        validate_rows(self.opts.mode, rows)?;
        if rows.len() < 20 {
            tracing::info!("This is what I got from the input file: {:?}", rows.iter().map(|r| (&r.source_id, &r.target)).collect::<Vec<_>>());
        }
        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            outcomes.push(self.upload_row(row).await?);
            tracing::info!("----------------------------------------");
        }
        Ok(outcomes)
    }

    pub async fn upload_row(&self, row: &InputRow) -> Result<RowOutcome> {
        let (subs, source_amara_id) = self.source_subtitles(row).await?;
        match self.deliver(row, subs, source_amara_id.as_deref()).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is::<Abort>() => Err(e),
            Err(e) => {
                tracing::error!(ytid = %row.target_or_source(), "{e:#}");
                Ok(RowOutcome::Failed)
            }
        }
    }

    fn is_original(&self) -> bool { self.opts.lang == self.opts.original_language }

    fn page(&self, amara_id: &str) -> String { video_page(&self.opts.site_url, &self.opts.lang, amara_id) }

    /// Subtitles known before touching the target video. YouTube downloads are deferred.
    async fn source_subtitles(&self, row: &InputRow) -> Result<(Option<String>, Option<String>)> {
        let lang = self.opts.lang.as_str();
        match self.opts.mode {
            Mode::Youtube => Ok((None, None)),
            Mode::Files => {
                let path = row.target.as_deref().unwrap_or_default();
                let subs = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("failed to read subtitles file: {path}"))?;
                Ok((Some(subs), None))
            }
            Mode::Amara => {
                let from = &row.source_id;
                let Some(src) = self.amara.check_video(&youtube_url(from)).await? else {
                    bail!("source video is not on Amara! YTID={from}");
                };
                tracing::info!(ytid = %from, title = src.title_or_empty(), page = %self.page(&src.id), "copying {lang} subtitles");
                let (present, version) = self.amara.check_language(&src.id, lang).await?;
                if !present {
                    bail!("Amara does not have subtitles in {lang} language for YTID={from}");
                }
                tracing::info!("Subtitle revision number: {version}");
                let subs = self.amara.download_subs(&src.id, lang, &self.opts.sub_format).await?;
                Ok((Some(subs), Some(src.id)))
            }
        }
    }

    async fn target_video(&self, ytid: &str) -> Result<Video> {
        let url = youtube_url(ytid);
        if let Some(video) = self.amara.check_video(&url).await? {
            tracing::info!(ytid, title = video.title_or_empty(), page = %self.page(&video.id), "video is already present on Amara");
            return Ok(video);
        }
        let Some(video) = self.amara.add_video(&url, &self.opts.original_language).await? else {
            bail!("adding video to Amara returned no id");
        };
        tracing::info!(ytid, amara_id = %video.id, title = video.title_or_empty(), page = %self.page(&video.id), "created video on Amara");
        Ok(video)
    }

    async fn deliver(&self, row: &InputRow, subs: Option<String>, source_amara_id: Option<&str>) -> Result<RowOutcome> {
        let lang = self.opts.lang.as_str();
        let target = match self.opts.mode {
            Mode::Amara => row.target_or_source(),
            _ => row.source_id.as_str(),
        };
        let video = self.target_video(target).await?;

        // Copying onto a video of different length would shift the timing.
        if let Some(src_id) = source_amara_id {
            if !self.amara.compare_videos(src_id, &video.id).await?
                && !self.prompter.confirm("The videos differ in length. Should I proceed anyway?")
            {
                return Ok(RowOutcome::Declined);
            }
        }

        let (present, version) = self.amara.check_language(&video.id, lang).await?;
        if present && version != 0 {
            tracing::info!(amara_id = %video.id, "Language {lang} is already present, subtitle revision number: {version}");
            if !self.opts.rewrite.should_rewrite(self.prompter) {
                return Ok(RowOutcome::KeptExisting);
            }
        } else if !present {
            self.amara.add_language(&video.id, lang, self.is_original()).await?;
        }

        let subs = match subs {
            Some(s) => s,
            None => match self.fetcher.fetch(&row.source_id, lang, &self.opts.sub_format).await? {
                FetchOutcome::Downloaded(s) => s,
                other => {
                    if let FetchOutcome::Failed(err) = &other {
                        tracing::error!(ytid = %row.source_id, "downloading subtitles failed: {err}");
                    } else {
                        tracing::error!(ytid = %row.source_id, "requested subtitles were not found on YouTube");
                    }
                    append_line(&self.opts.failed_file, &row.source_id).await?;
                    if self.opts.skip_errors || self.prompter.confirm("Should I continue with the rest anyway?") {
                        return Ok(RowOutcome::NotOnYoutube);
                    }
                    return Err(Abort(format!("stopped after failed download of {}", row.source_id)).into());
                }
            },
        };

        let r = self.amara.upload_subs(&video.id, lang, true, &subs, &self.opts.sub_format).await?;
        if r.version_number == Some(version + 1) {
            tracing::info!("Successfully uploaded subtitles to: {}", r.site_uri.as_deref().unwrap_or_default());
            Ok(RowOutcome::Uploaded)
        } else {
            tracing::error!(response = %r.raw, "unexpected response from Amara, something probably went wrong during upload");
            Err(Abort(format!("upload for {} returned {:?}, expected revision {}", video.id, r.version_number, version + 1)).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::parse_rows;
    use crate::prompt::testing::Scripted;
    use crate::testing::{FakeAmara, FakeFetcher};

    fn opts(mode: Mode, rewrite: RewritePolicy, dir: &std::path::Path) -> UploadOptions {
        UploadOptions {
            mode,
            lang: "cs".into(),
            sub_format: "vtt".into(),
            original_language: "en".into(),
            skip_errors: false,
            rewrite,
            failed_file: dir.join("failed_yt.dat"),
            site_url: "https://amara.test/".into(),
        }
    }

    #[test]
    fn files_mode_requires_filename_column() {
        assert!(validate_rows(Mode::Files, &parse_rows("abc\n")).is_err());
        assert!(validate_rows(Mode::Files, &parse_rows("abc abc.vtt\n")).is_ok());
        assert!(validate_rows(Mode::Youtube, &parse_rows("abc\n")).is_ok());
        assert!(validate_rows(Mode::Amara, &parse_rows("from\n")).is_err());
    }

    #[tokio::test]
    async fn never_policy_keeps_existing_subtitles() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new().with_video("yt1", "am1", 60, &[("cs", 3, true)]);
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::new(&[true]);
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Youtube, RewritePolicy::from_flags(true, true), tmp.path()));

        let out = up.run(&parse_rows("yt1\n")).await.unwrap();
        assert_eq!(out, vec![RowOutcome::KeptExisting]);
        assert_eq!(amara.count("upload_subs"), 0);
        assert_eq!(prompter.asked_count(), 0);
        assert!(fetcher.fetched().is_empty());
    }

    #[tokio::test]
    async fn prompt_policy_asks_before_rewriting() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new().with_video("yt1", "am1", 60, &[("cs", 3, true)]);
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::new(&[true]);
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Youtube, RewritePolicy::Prompt, tmp.path()));

        let out = up.run(&parse_rows("yt1\n")).await.unwrap();
        assert_eq!(out, vec![RowOutcome::Uploaded]);
        assert_eq!(prompter.asked_count(), 1);
        assert_eq!(amara.revision("am1", "cs"), Some(4));
    }

    #[tokio::test]
    async fn files_mode_uploads_file_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("yt1.cs.vtt");
        std::fs::write(&file, "WEBVTT\n\n00:00.000 --> 00:01.000\nAhoj\n").unwrap();
        let amara = FakeAmara::new();
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::default();
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Files, RewritePolicy::Never, tmp.path()));

        let rows = parse_rows(&format!("yt1 {}\n", file.display()));
        assert_eq!(up.run(&rows).await.unwrap(), vec![RowOutcome::Uploaded]);
        assert_eq!(amara.calls(), vec!["check_video", "add_video", "check_language", "add_language", "upload_subs"]);
        assert!(fetcher.fetched().is_empty());
        assert_eq!(amara.added_languages(), vec![("new1".to_string(), "cs".to_string(), false)]);
    }

    #[tokio::test]
    async fn original_language_is_flagged_when_added() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new().with_video("yt1", "am1", 60, &[]);
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::default();
        let o = UploadOptions { lang: "en".into(), ..opts(Mode::Youtube, RewritePolicy::Never, tmp.path()) };
        let up = ModalUpload::new(&amara, &fetcher, &prompter, o);

        assert_eq!(up.run(&parse_rows("yt1\n")).await.unwrap(), vec![RowOutcome::Uploaded]);
        assert_eq!(amara.added_languages(), vec![("am1".to_string(), "en".to_string(), true)]);
    }

    #[tokio::test]
    async fn always_policy_rewrites_without_asking() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new().with_video("yt1", "am1", 60, &[("cs", 3, true)]);
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::default();
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Youtube, RewritePolicy::Always, tmp.path()));

        assert_eq!(up.run(&parse_rows("yt1\n")).await.unwrap(), vec![RowOutcome::Uploaded]);
        assert_eq!(prompter.asked_count(), 0);
        assert_eq!(amara.count("add_language"), 0);
        assert_eq!(amara.revision("am1", "cs"), Some(4));
    }

    #[tokio::test]
    async fn empty_existing_language_gets_first_revision() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new().with_video("yt1", "am1", 60, &[("cs", 0, false)]);
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::default();
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Youtube, RewritePolicy::Never, tmp.path()));

        assert_eq!(up.run(&parse_rows("yt1\n")).await.unwrap(), vec![RowOutcome::Uploaded]);
        assert_eq!(amara.count("add_language"), 0);
        assert_eq!(prompter.asked_count(), 0);
        assert_eq!(amara.revision("am1", "cs"), Some(1));
    }

    #[tokio::test]
    async fn unreadable_subtitle_file_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new();
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::default();
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Files, RewritePolicy::Never, tmp.path()));
        assert!(up.run(&parse_rows("yt1 /nonexistent/subs.vtt\n")).await.is_err());
        assert!(amara.calls().is_empty());
    }

    #[tokio::test]
    async fn amara_mode_copies_between_videos() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new()
            .with_video("src", "amsrc", 100, &[("cs", 2, true)])
            .with_video("dst", "amdst", 100, &[]);
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::default();
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Amara, RewritePolicy::Never, tmp.path()));

        assert_eq!(up.run(&parse_rows("src dst\n")).await.unwrap(), vec![RowOutcome::Uploaded]);
        assert_eq!(amara.count("download_subs"), 1);
        assert_eq!(amara.revision("amdst", "cs"), Some(1));
        assert_eq!(prompter.asked_count(), 0);
    }

    #[tokio::test]
    async fn amara_mode_length_mismatch_can_be_declined() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new()
            .with_video("src", "amsrc", 100, &[("cs", 2, true)])
            .with_video("dst", "amdst", 250, &[]);
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::new(&[false]);
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Amara, RewritePolicy::Never, tmp.path()));

        assert_eq!(up.run(&parse_rows("src dst\n")).await.unwrap(), vec![RowOutcome::Declined]);
        assert_eq!(amara.count("upload_subs"), 0);
    }

    #[tokio::test]
    async fn amara_mode_missing_source_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new();
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::default();
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Amara, RewritePolicy::Never, tmp.path()));
        assert!(up.run(&parse_rows("src dst\n")).await.is_err());
    }

    #[tokio::test]
    async fn skip_errors_continues_after_missing_youtube_subs() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new();
        let fetcher = FakeFetcher::new().with("gone", FetchOutcome::NotAvailable);
        let prompter = Scripted::default();
        let mut o = opts(Mode::Youtube, RewritePolicy::Never, tmp.path());
        o.skip_errors = true;
        let failed = o.failed_file.clone();
        let up = ModalUpload::new(&amara, &fetcher, &prompter, o);

        let out = up.run(&parse_rows("gone\nok\n")).await.unwrap();
        assert_eq!(out, vec![RowOutcome::NotOnYoutube, RowOutcome::Uploaded]);
        assert_eq!(prompter.asked_count(), 0);
        assert_eq!(std::fs::read_to_string(failed).unwrap(), "gone\n");
    }

    #[tokio::test]
    async fn declining_to_continue_aborts_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara::new();
        let fetcher = FakeFetcher::new().with("gone", FetchOutcome::Failed("ERROR: unavailable".into()));
        let prompter = Scripted::new(&[false]);
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Youtube, RewritePolicy::Never, tmp.path()));

        let err = up.run(&parse_rows("gone\nok\n")).await.unwrap_err();
        assert!(err.is::<Abort>());
        assert_eq!(fetcher.fetched(), vec!["gone"]);
    }

    #[tokio::test]
    async fn unexpected_revision_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let amara = FakeAmara { upload_version: Some(Some(7)), ..FakeAmara::default() };
        let fetcher = FakeFetcher::new();
        let prompter = Scripted::default();
        let up = ModalUpload::new(&amara, &fetcher, &prompter, opts(Mode::Youtube, RewritePolicy::Never, tmp.path()));
        assert!(up.run(&parse_rows("yt1\n")).await.is_err());
    }
}
