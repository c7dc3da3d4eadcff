//! Amara REST API client.
//!
//! Every call is a single request with the account headers attached. There is
//! no retry: a failed call is reported to the caller, which decides whether to
//! skip the row or abort the run.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::{AmaraConfig, Credentials};

#[derive(Debug, Error)]
pub enum AmaraError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Amara returned {status} for {url}: {body}")]
    Status { status: StatusCode, url: String, body: String },
    #[error("invalid Amara URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected Amara reply: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid header value: {0}")]
    Header(String),
}

pub type Result<T> = std::result::Result<T, AmaraError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoLookup {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub objects: Vec<Video>,
}

impl VideoLookup {
    pub fn first(self) -> Option<Video> {
        if self.meta.total_count == 0 { return None; }
        self.objects.into_iter().next()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub languages: Vec<LanguageEntry>,
}

impl Video {
    pub fn language(&self, code: &str) -> Option<&LanguageEntry> {
        self.languages.iter().find(|l| l.code == code)
    }

    pub fn title_or_empty(&self) -> &str { self.title.as_deref().unwrap_or("") }
}

/// Language summary embedded in a video record. A language can exist with no
/// published revision, in which case it is not visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub code: String,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtitleLanguage {
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub versions: Vec<serde_json::Value>,
}

impl SubtitleLanguage {
    pub fn revision(&self) -> u32 { self.versions.len() as u32 }
}

/// Upload reply. Success is signalled by `version_number`; the raw body is kept for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct UploadResponse {
    pub version_number: Option<u32>,
    pub site_uri: Option<String>,
    pub raw: serde_json::Value,
}

impl UploadResponse {
    pub fn from_json(raw: serde_json::Value) -> Self {
        let version_number = raw.get("version_number").and_then(|v| v.as_u64()).map(|v| v as u32);
        let site_uri = raw.get("site_uri").and_then(|v| v.as_str()).map(str::to_string);
        Self { version_number, site_uri, raw }
    }
}

#[derive(Debug, Serialize)]
struct NewVideo<'a> {
    video_url: &'a str,
    primary_audio_language_code: &'a str,
}

#[derive(Debug, Serialize)]
struct NewLanguage<'a> {
    language_code: &'a str,
    is_original: bool,
}

#[derive(Debug, Serialize)]
struct NewSubtitles<'a> {
    subtitles: &'a str,
    sub_format: &'a str,
    is_complete: bool,
}

/// The subset of the Amara API the drivers use.
#[async_trait]
pub trait AmaraApi: Send + Sync {
    /// Look a video up by its media URL.
    async fn check_video(&self, video_url: &str) -> Result<Option<Video>>;
    /// Create a video. `None` when the reply carries no id.
    async fn add_video(&self, video_url: &str, primary_lang: &str) -> Result<Option<Video>>;
    async fn video(&self, amara_id: &str) -> Result<Video>;
    /// `(present, revision)` for a language of a video.
    async fn check_language(&self, amara_id: &str, lang: &str) -> Result<(bool, u32)>;
    async fn add_language(&self, amara_id: &str, lang: &str, is_original: bool) -> Result<()>;
    async fn upload_subs(&self, amara_id: &str, lang: &str, is_complete: bool, subs: &str, sub_format: &str) -> Result<UploadResponse>;
    async fn download_subs(&self, amara_id: &str, lang: &str, sub_format: &str) -> Result<String>;

    /// True when both videos report the same duration.
    async fn compare_videos(&self, amara_id_a: &str, amara_id_b: &str) -> Result<bool> {
        let a = self.video(amara_id_a).await?;
        let b = self.video(amara_id_b).await?;
        if a.duration != b.duration {
            tracing::warn!(from = amara_id_a, to = amara_id_b, from_len = ?a.duration, to_len = ?b.duration, "video lengths differ");
            return Ok(false);
        }
        Ok(true)
    }
}

pub struct AmaraClient {
    http: reqwest::Client,
    api_url: Url,
    site_url: String,
}

impl AmaraClient {
    pub fn new(cfg: &AmaraConfig, creds: &Credentials) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static("format"), HeaderValue::from_static("json"));
        headers.insert(HeaderName::from_static("x-api-username"), header_value(&creds.username)?);
        headers.insert(HeaderName::from_static("x-api-key"), header_value(&creds.api_key)?);
        let http = reqwest::Client::builder()
            .user_agent(concat!("kasync/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;
        let api_url = Url::parse(&with_trailing_slash(&cfg.api_url))?;
        Ok(Self { http, api_url, site_url: with_trailing_slash(&cfg.site_url) })
    }

    /// Human-facing page of a video in a given language.
    pub fn video_page(&self, lang: &str, amara_id: &str) -> String {
        video_page(&self.site_url, lang, amara_id)
    }

    fn endpoint(&self, path: &str) -> Result<Url> { Ok(self.api_url.join(path)?) }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let resp = self.http.get(url.clone()).send().await?;
        Ok(check_status(resp, &url).await?.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<serde_json::Value> {
        tracing::debug!(%url, "POST");
        let resp = self.http.post(url.clone()).json(body).send().await?;
        Ok(check_status(resp, &url).await?.json().await?)
    }
}

#[async_trait]
impl AmaraApi for AmaraClient {
    async fn check_video(&self, video_url: &str) -> Result<Option<Video>> {
        let mut url = self.endpoint("videos/")?;
        url.query_pairs_mut().append_pair("video_url", video_url);
        let lookup: VideoLookup = self.get_json(url).await?;
        Ok(lookup.first())
    }

    async fn add_video(&self, video_url: &str, primary_lang: &str) -> Result<Option<Video>> {
        let url = self.endpoint("videos/")?;
        let raw = self.post_json(url, &NewVideo { video_url, primary_audio_language_code: primary_lang }).await?;
        created_video(raw)
    }

    async fn video(&self, amara_id: &str) -> Result<Video> {
        let url = self.endpoint(&format!("videos/{amara_id}/"))?;
        self.get_json(url).await
    }

    async fn check_language(&self, amara_id: &str, lang: &str) -> Result<(bool, u32)> {
        let url = self.endpoint(&format!("videos/{amara_id}/languages/{lang}/"))?;
        let resp = self.http.get(url.clone()).send().await?;
        if resp.status() == StatusCode::NOT_FOUND { return Ok((false, 0)); }
        let language: SubtitleLanguage = check_status(resp, &url).await?.json().await?;
        Ok((true, language.revision()))
    }

    async fn add_language(&self, amara_id: &str, lang: &str, is_original: bool) -> Result<()> {
        let url = self.endpoint(&format!("videos/{amara_id}/languages/"))?;
        self.post_json(url, &NewLanguage { language_code: lang, is_original }).await?;
        Ok(())
    }

    async fn upload_subs(&self, amara_id: &str, lang: &str, is_complete: bool, subs: &str, sub_format: &str) -> Result<UploadResponse> {
        let url = self.endpoint(&format!("videos/{amara_id}/languages/{lang}/subtitles/"))?;
        // Rejected uploads still come back as JSON; keep them for the caller to inspect.
        let resp = self.http.post(url).json(&NewSubtitles { subtitles: subs, sub_format, is_complete }).send().await?;
        let raw: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        Ok(UploadResponse::from_json(raw))
    }

    async fn download_subs(&self, amara_id: &str, lang: &str, sub_format: &str) -> Result<String> {
        let mut url = self.endpoint(&format!("videos/{amara_id}/languages/{lang}/subtitles/"))?;
        url.query_pairs_mut().append_pair("sub_format", sub_format);
        let resp = self.http.get(url.clone()).send().await?;
        Ok(check_status(resp, &url).await?.text().await?)
    }
}

async fn check_status(resp: reqwest::Response, url: &Url) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() { return Ok(resp); }
    let body = resp.text().await.unwrap_or_default();
    Err(AmaraError::Status { status, url: url.to_string(), body })
}

/// `None` when the reply has no id; an id with an undecodable body is an error.
fn created_video(raw: serde_json::Value) -> Result<Option<Video>> {
    if raw.get("id").is_none() {
        tracing::debug!(response = %raw, "add_video reply without id");
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(raw)?))
}

fn header_value(v: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(v).map_err(|e| AmaraError::Header(e.to_string()))
}

fn with_trailing_slash(s: &str) -> String {
    if s.ends_with('/') { s.to_string() } else { format!("{s}/") }
}

pub fn video_page(site_url: &str, lang: &str, amara_id: &str) -> String {
    format!("{}{lang}/videos/{amara_id}", with_trailing_slash(site_url))
}

pub fn youtube_url(ytid: &str) -> String {
    format!("https://www.youtube.com/watch?v={ytid}")
}
