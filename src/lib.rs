pub mod amara;
pub mod config;
pub mod db;
pub mod ema;
pub mod export;
pub mod input;
pub mod khan;
pub mod mapping;
pub mod prompt;
pub mod storage;
pub mod sync;
pub mod upload;
pub mod youtube;

#[cfg(test)]
mod testing;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::amara::{AmaraApi, AmaraClient, AmaraError};
    pub use crate::config::{Credentials, Settings};
    pub use crate::ema::{EmaId, EmaItem};
    pub use crate::export::ExportReport;
    pub use crate::khan::ContentKind;
    pub use crate::prompt::{Prompter, RewritePolicy, StdinPrompter};
    pub use crate::storage::{DatFile, ProgressStore};
    pub use crate::sync::SyncReport;
    pub use crate::upload::{Mode, RowOutcome};
    pub use crate::youtube::{FetchOutcome, SubtitleFetcher, YoutubeDl};
    pub use crate::Kasync;
}

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::amara::AmaraClient;
use crate::config::{read_password, Credentials, Settings};
use crate::db::Database;
use crate::export::{export_ka_course, export_ks_schema, ka_output_name, ks_output_name, ks_schema_id, write_feed, ExportReport};
use crate::input::{parse_id_list, read_rows};
use crate::khan::{ContentKind, KhanClient};
use crate::prompt::{RewritePolicy, StdinPrompter};
use crate::storage::{read_id_set, remove_stale, DatFile};
use crate::sync::{BulkSync, SyncOptions, SyncReport};
use crate::upload::{Mode, ModalUpload, RowOutcome, UploadOptions};
use crate::youtube::YoutubeDl;

/// Ids listed here are never synced.
pub const SKIP_FILE: &str = "skip_videos.dat";

pub fn progress_file(lang: &str) -> PathBuf { PathBuf::from(format!("videos_on_amara.{lang}.dat")) }

/// High-level entry points, one per subcommand.
pub struct Kasync {
    settings: Settings,
}

impl Kasync {
    pub fn new(settings: Settings) -> Self { Self { settings } }

    pub fn settings(&self) -> &Settings { &self.settings }

    fn amara(&self, credentials: &Path) -> Result<AmaraClient> {
        let creds = Credentials::from_file(credentials)?;
        tracing::debug!(?creds, "loaded Amara credentials");
        AmaraClient::new(&self.settings.amara, &creds)
    }

    fn youtube(&self) -> YoutubeDl { YoutubeDl::new(self.settings.youtube.clone()) }

    /// Bulk YouTube to Amara sync for one language.
    pub async fn sync(&self, input: &Path, lang: &str, credentials: &Path) -> Result<SyncReport> {
        let rows = read_rows(input).await?;
        let amara = self.amara(credentials)?;
        remove_stale(&[self.settings.youtube.failed_file.as_path()]).await;
        let yt = self.youtube();
        yt.prepare().await?;
        let mut progress = DatFile::open(progress_file(lang)).await?;
        tracing::info!(processed = progress.len(), file = %progress.path().display(), "loaded progress");
        let skip = read_id_set(Path::new(SKIP_FILE)).await?;

        let opts = SyncOptions {
            lang: lang.to_string(),
            sub_format: self.settings.amara.sub_format.clone(),
            original_language: self.settings.amara.original_language.clone(),
            failed_file: self.settings.youtube.failed_file.clone(),
        };
        BulkSync::new(&amara, &yt, &mut progress, skip, opts).run(&rows).await
    }

    /// Per-video upload with the subtitle source chosen by `mode`.
    pub async fn upload(&self, input: &Path, credentials: &Path, mode: Mode, lang: &str, skip_errors: bool, rewrite: RewritePolicy) -> Result<Vec<RowOutcome>> {
        let rows = read_rows(input).await?;
        upload::validate_rows(mode, &rows)?;
        let amara = self.amara(credentials)?;
        // Failed ids from earlier runs are kept; only the downloader logs are reset.
        let yt = self.youtube();
        if mode == Mode::Youtube {
            yt.prepare().await?;
        }
        let opts = UploadOptions {
            mode,
            lang: lang.to_string(),
            sub_format: self.settings.amara.sub_format.clone(),
            original_language: self.settings.amara.original_language.clone(),
            skip_errors,
            rewrite,
            failed_file: self.settings.youtube.failed_file.clone(),
            site_url: self.settings.amara.site_url.clone(),
        };
        ModalUpload::new(&amara, &yt, &StdinPrompter, opts).run(&rows).await
    }

    /// Exports one Khan Academy course; returns the feed path and the export counts.
    pub async fn ka_export(&self, course: &str, kind: ContentKind, refresh: bool, out_dir: &Path) -> Result<(PathBuf, ExportReport)> {
        let listed_file = &self.settings.khan.listed_file;
        let text = tokio::fs::read_to_string(listed_file)
            .await
            .with_context(|| format!("failed to read allow-list {}", listed_file.display()))?;
        let listed = parse_id_list(&text, &listed_file.display().to_string());

        let cache = match config::cache_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                tracing::warn!("topic tree cache disabled: {e:#}");
                None
            }
        };
        let tree = KhanClient::new(&self.settings.khan, cache)?.content_tree(kind, refresh).await?;
        let report = export_ka_course(&tree, course, kind, &listed)?;

        let path = out_dir.join(ka_output_name(course, kind));
        write_feed(&path, &report.items).await?;
        tracing::info!("Number of EMA {} in {course} = {}", kind.as_str(), report.items.len());
        Ok((path, report))
    }

    async fn ks_database(&self, password: Option<&str>) -> Result<Database> {
        let password = match password {
            Some(p) => p.to_string(),
            None => read_password(&self.settings.khanova_skola.password_file)?,
        };
        let db = Database::connect(&db::url_for(&self.settings.khanova_skola, &password)?).await?;
        tracing::info!("PostgreSQL database version: {}", db.server_version().await?);
        Ok(db)
    }

    /// `(id, title)` of every Khanova škola schema.
    pub async fn ks_schemas(&self, password: Option<&str>) -> Result<Vec<(i64, String)>> {
        let db = self.ks_database(password).await?;
        let schemas = db.list_schemas().await;
        db.close().await;
        schemas
    }

    /// Exports the videos of one Khanova škola schema.
    pub async fn ks_export(&self, schema: &str, password: Option<&str>, out_dir: &Path) -> Result<(PathBuf, ExportReport)> {
        let schema_id = ks_schema_id(schema).with_context(|| format!("invalid schema {schema}"))?;
        let db = self.ks_database(password).await?;
        let rows = db.schema_content(schema_id).await;
        db.close().await;
        let videos: Vec<_> = rows?.into_iter().map(db::ContentRow::into_video).collect();

        let report = export_ks_schema(schema, &videos)?;
        let path = out_dir.join(ks_output_name(schema));
        write_feed(&path, &report.items).await?;
        tracing::info!("Number of EMA video in {schema} = {}", report.items.len());
        Ok((path, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_file_is_per_language() {
        assert_eq!(progress_file("cs"), PathBuf::from("videos_on_amara.cs.dat"));
    }

    #[tokio::test]
    async fn unknown_schema_fails_before_connecting() {
        let k = Kasync::new(Settings::default());
        let tmp = tempfile::tempdir().unwrap();
        let err = k.ks_export("biologie", Some("x"), tmp.path()).await.unwrap_err();
        assert!(err.to_string().contains("invalid schema"));
    }

    #[tokio::test]
    async fn upload_rejects_incomplete_rows_before_reading_credentials() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.txt");
        std::fs::write(&input, "abc file.vtt\ndef\n").unwrap();
        let k = Kasync::new(Settings::default());
        let err = k
            .upload(&input, &tmp.path().join("missing.txt"), Mode::Files, "cs", false, RewritePolicy::Never)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing the second column"));
    }

    fn settings_in(dir: &Path) -> Settings {
        let mut s = Settings::default();
        s.youtube.subs_dir = dir.join("subs");
        s.youtube.stdout_log = dir.join("youtubedl.out");
        s.youtube.stderr_log = dir.join("youtubedl.err");
        s.youtube.failed_file = dir.join("failed_yt.dat");
        s
    }

    #[tokio::test]
    async fn files_upload_keeps_failed_list_and_skips_downloader_setup() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        std::fs::write(&settings.youtube.failed_file, "earlier\n").unwrap();
        let creds = tmp.path().join("myapi.txt");
        std::fs::write(&creds, "key user\n").unwrap();
        let input = tmp.path().join("in.txt");
        std::fs::write(&input, format!("yt1 {}\n", tmp.path().join("missing.vtt").display())).unwrap();

        let k = Kasync::new(settings);
        assert!(k.upload(&input, &creds, Mode::Files, "cs", false, RewritePolicy::Never).await.is_err());
        assert_eq!(std::fs::read_to_string(&k.settings().youtube.failed_file).unwrap(), "earlier\n");
        assert!(!k.settings().youtube.subs_dir.exists());
    }

    #[tokio::test]
    async fn sync_starts_with_a_fresh_failed_list() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        std::fs::write(&settings.youtube.failed_file, "earlier\n").unwrap();
        let creds = tmp.path().join("myapi.txt");
        std::fs::write(&creds, "key user\n").unwrap();
        let input = tmp.path().join("ids.txt");
        std::fs::write(&input, "# nothing to do\n").unwrap();

        let k = Kasync::new(settings);
        let report = k.sync(&input, "xx-test", &creds).await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert!(!k.settings().youtube.failed_file.exists());
        assert!(k.settings().youtube.subs_dir.is_dir());
    }
}
