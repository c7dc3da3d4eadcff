//! Khan Academy topic tree: fetching, on-disk caching and traversal.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use url::Url;

use crate::config::KhanConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ContentKind {
    Video,
    Exercise,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Exercise => "exercise",
        }
    }

    /// Node `kind` as spelled by the API.
    pub fn api_kind(self) -> &'static str {
        match self {
            ContentKind::Video => "Video",
            ContentKind::Exercise => "Exercise",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicNode {
    pub kind: String,
    pub id: String,
    pub slug: String,
    pub children: Vec<TopicNode>,
    pub ka_url: Option<String>,
    pub translated_title: Option<String>,
    pub translated_description: Option<String>,
    pub creation_date: Option<String>,
    pub ka_user_license: Option<String>,
}

impl TopicNode {
    pub fn is_topic(&self) -> bool { self.kind.eq_ignore_ascii_case("topic") }
}

/// Depth-first search for the topic with a given slug.
pub fn find_topic<'a>(node: &'a TopicNode, slug: &str) -> Option<&'a TopicNode> {
    if node.is_topic() && node.slug == slug { return Some(node); }
    node.children.iter().find_map(|c| find_topic(c, slug))
}

/// All content items of a kind below a node, in tree order.
pub fn content_items(node: &TopicNode, kind: ContentKind) -> Vec<&TopicNode> {
    let mut out = Vec::new();
    collect_items(node, kind, &mut out);
    out
}

fn collect_items<'a>(node: &'a TopicNode, kind: ContentKind, out: &mut Vec<&'a TopicNode>) {
    if node.kind.eq_ignore_ascii_case(kind.api_kind()) {
        out.push(node);
    }
    for c in &node.children {
        collect_items(c, kind, out);
    }
}

pub struct KhanClient {
    http: reqwest::Client,
    api_url: Url,
    locale: String,
    cache_dir: Option<PathBuf>,
    ttl: Duration,
}

impl KhanClient {
    pub fn new(cfg: &KhanConfig, cache_dir: Option<PathBuf>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("kasync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let api_url = Url::parse(&cfg.api_url).with_context(|| format!("invalid Khan API URL: {}", cfg.api_url))?;
        Ok(Self { http, api_url, locale: cfg.locale.clone(), cache_dir, ttl: Duration::from_secs(cfg.tree_ttl_secs) })
    }

    pub fn tree_url(&self, kind: ContentKind) -> Result<Url> {
        let mut url = self.api_url.join("topictree")?;
        url.query_pairs_mut().append_pair("kind", kind.api_kind()).append_pair("lang", &self.locale);
        Ok(url)
    }

    fn cache_path(&self, kind: ContentKind) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|d| d.join(format!("topictree_{}_{}.json", self.locale, kind.as_str())))
    }

    /// Full topic tree for a content kind, served from cache while it is fresh.
    pub async fn content_tree(&self, kind: ContentKind, refresh: bool) -> Result<TopicNode> {
        let cache = self.cache_path(kind);
        if !refresh {
            if let Some(path) = cache.as_deref() {
                if let Some(tree) = read_fresh(path, self.ttl).await {
                    tracing::debug!(path = %path.display(), "using cached topic tree");
                    return Ok(tree);
                }
            }
        }

        let url = self.tree_url(kind)?;
        tracing::info!(%url, "downloading Khan Academy topic tree");
        let resp = self.http.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            bail!("Khan Academy API returned {} for {url}", resp.status());
        }
        let body = resp.text().await?;
        let tree: TopicNode = serde_json::from_str(&body).context("decoding topic tree")?;
        if let Some(path) = cache.as_deref() {
            if let Err(e) = tokio::fs::write(path, &body).await {
                tracing::warn!(path = %path.display(), error = %e, "could not cache topic tree");
            }
        }
        Ok(tree)
    }
}

pub fn is_fresh(modified: SystemTime, now: SystemTime, ttl: Duration) -> bool {
    now.duration_since(modified).map(|age| age < ttl).unwrap_or(true)
}

async fn read_fresh(path: &Path, ttl: Duration) -> Option<TopicNode> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !is_fresh(meta.modified().ok()?, SystemTime::now(), ttl) { return None; }
    let text = tokio::fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&text).ok()
}
