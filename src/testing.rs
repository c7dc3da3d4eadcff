//! In-memory stand-ins for the external services, shared by driver tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::amara::{self, AmaraApi, LanguageEntry, UploadResponse, Video};
use crate::youtube::{FetchOutcome, SubtitleFetcher};

#[derive(Default)]
pub struct AmaraState {
    /// Keyed by media URL.
    videos: HashMap<String, Video>,
    /// (amara id, lang) -> revision count
    revisions: HashMap<(String, String), u32>,
    subtitles: HashMap<(String, String), String>,
    next_id: u32,
}

#[derive(Default)]
pub struct FakeAmara {
    pub state: Mutex<AmaraState>,
    pub calls: Mutex<Vec<String>>,
    /// (amara id, lang, is_original) per `add_language` call.
    pub added_languages: Mutex<Vec<(String, String, bool)>>,
    pub refuse_new_videos: bool,
    /// Replaces the version number reported by uploads.
    pub upload_version: Option<Option<u32>>,
}

impl FakeAmara {
    pub fn new() -> Self { Self::default() }

    /// Registers a video for a YTID with `(lang, revision, visible)` entries.
    pub fn with_video(self, ytid: &str, amara_id: &str, duration: u64, langs: &[(&str, u32, bool)]) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            let video = Video {
                id: amara_id.to_string(),
                title: Some(format!("Video {ytid}")),
                duration: Some(duration),
                languages: langs.iter().map(|(code, _, visible)| LanguageEntry { code: code.to_string(), visible: *visible }).collect(),
            };
            st.videos.insert(amara::youtube_url(ytid), video);
            for (code, rev, _) in langs {
                st.revisions.insert((amara_id.to_string(), code.to_string()), *rev);
                st.subtitles.insert((amara_id.to_string(), code.to_string()), format!("WEBVTT\n\n{amara_id} {code}"));
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }

    pub fn count(&self, name: &str) -> usize { self.calls().iter().filter(|c| c.as_str() == name).count() }

    pub fn revision(&self, amara_id: &str, lang: &str) -> Option<u32> {
        self.state.lock().unwrap().revisions.get(&(amara_id.to_string(), lang.to_string())).copied()
    }

    pub fn added_languages(&self) -> Vec<(String, String, bool)> { self.added_languages.lock().unwrap().clone() }

    fn log(&self, name: &str) { self.calls.lock().unwrap().push(name.to_string()); }
}

#[async_trait]
impl AmaraApi for FakeAmara {
    async fn check_video(&self, video_url: &str) -> amara::Result<Option<Video>> {
        self.log("check_video");
        Ok(self.state.lock().unwrap().videos.get(video_url).cloned())
    }

    async fn add_video(&self, video_url: &str, _primary_lang: &str) -> amara::Result<Option<Video>> {
        self.log("add_video");
        if self.refuse_new_videos { return Ok(None); }
        let mut st = self.state.lock().unwrap();
        st.next_id += 1;
        let video = Video { id: format!("new{}", st.next_id), title: Some("New".into()), duration: Some(100), languages: vec![] };
        st.videos.insert(video_url.to_string(), video.clone());
        Ok(Some(video))
    }

    async fn video(&self, amara_id: &str) -> amara::Result<Video> {
        self.log("video");
        let st = self.state.lock().unwrap();
        Ok(st.videos.values().find(|v| v.id == amara_id).cloned().unwrap_or_default())
    }

    async fn check_language(&self, amara_id: &str, lang: &str) -> amara::Result<(bool, u32)> {
        self.log("check_language");
        let st = self.state.lock().unwrap();
        Ok(match st.revisions.get(&(amara_id.to_string(), lang.to_string())) {
            Some(rev) => (true, *rev),
            None => (false, 0),
        })
    }

    async fn add_language(&self, amara_id: &str, lang: &str, is_original: bool) -> amara::Result<()> {
        self.log("add_language");
        self.added_languages.lock().unwrap().push((amara_id.to_string(), lang.to_string(), is_original));
        self.state.lock().unwrap().revisions.insert((amara_id.to_string(), lang.to_string()), 0);
        Ok(())
    }

    async fn upload_subs(&self, amara_id: &str, lang: &str, _is_complete: bool, subs: &str, _sub_format: &str) -> amara::Result<UploadResponse> {
        self.log("upload_subs");
        let mut st = self.state.lock().unwrap();
        let key = (amara_id.to_string(), lang.to_string());
        let rev = st.revisions.entry(key.clone()).or_insert(0);
        *rev += 1;
        let version = *rev;
        st.subtitles.insert(key, subs.to_string());
        let version = self.upload_version.unwrap_or(Some(version));
        let raw = match version {
            Some(v) => serde_json::json!({"version_number": v, "site_uri": format!("https://amara.test/{lang}/videos/{amara_id}")}),
            None => serde_json::json!({"detail": "rejected"}),
        };
        Ok(UploadResponse::from_json(raw))
    }

    async fn download_subs(&self, amara_id: &str, lang: &str, _sub_format: &str) -> amara::Result<String> {
        self.log("download_subs");
        Ok(self.state.lock().unwrap().subtitles.get(&(amara_id.to_string(), lang.to_string())).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    outcomes: HashMap<String, FetchOutcome>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, ytid: &str, outcome: FetchOutcome) -> Self {
        self.outcomes.insert(ytid.to_string(), outcome);
        self
    }

    pub fn fetched(&self) -> Vec<String> { self.fetched.lock().unwrap().clone() }
}

#[async_trait]
impl SubtitleFetcher for FakeFetcher {
    async fn fetch(&self, ytid: &str, _lang: &str, _sub_format: &str) -> Result<FetchOutcome> {
        self.fetched.lock().unwrap().push(ytid.to_string());
        Ok(self.outcomes.get(ytid).cloned().unwrap_or_else(|| FetchOutcome::Downloaded(format!("WEBVTT\n\n{ytid}"))))
    }
}
