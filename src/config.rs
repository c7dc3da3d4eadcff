use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime settings. Every field has a default so a missing config file is fine.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub amara: AmaraConfig,
    pub youtube: YoutubeConfig,
    pub khan: KhanConfig,
    pub khanova_skola: KsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AmaraConfig {
    pub api_url: String,
    pub site_url: String,
    /// Audio language of the videos; a subtitle in this language is marked original.
    pub original_language: String,
    pub sub_format: String,
}

impl Default for AmaraConfig {
    fn default() -> Self {
        Self {
            api_url: "https://amara.org/api/".into(),
            site_url: "https://amara.org/".into(),
            original_language: "en".into(),
            sub_format: "vtt".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct YoutubeConfig {
    pub program: String,
    pub subs_dir: PathBuf,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    pub failed_file: PathBuf,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            program: "youtube-dl".into(),
            subs_dir: "subs".into(),
            stdout_log: "youtubedl.out".into(),
            stderr_log: "youtubedl.err".into(),
            failed_file: "failed_yt.dat".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KhanConfig {
    pub api_url: String,
    pub locale: String,
    pub listed_file: PathBuf,
    pub tree_ttl_secs: u64,
}

impl Default for KhanConfig {
    fn default() -> Self {
        Self {
            api_url: "https://www.khanacademy.org/api/v1/".into(),
            locale: "cs".into(),
            listed_file: "indexable_slugs.txt".into(),
            tree_ttl_secs: 24 * 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KsConfig {
    pub host: String,
    pub database: String,
    pub user: String,
    pub password_file: PathBuf,
}

impl Default for KsConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            database: "khanovaskola".into(),
            user: "postgres".into(),
            password_file: "psql.psswd".into(),
        }
    }
}

impl Settings {
    /// Load from an explicit path, else `kasync.toml` in the user config dir, else defaults.
    /// Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        settings.apply_env();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config: {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("KASYNC_AMARA_API_URL") { self.amara.api_url = v; }
        if let Ok(v) = std::env::var("KASYNC_YOUTUBE_DL") { self.youtube.program = v; }
        if let Some(ttl) = std::env::var("KASYNC_TREE_TTL_SECS").ok().and_then(|s| s.parse().ok()) {
            self.khan.tree_ttl_secs = ttl;
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("cz", "khanovaskola", "kasync").map(|p| p.config_dir().join("kasync.toml"))
}

pub fn cache_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("cz", "khanovaskola", "kasync")
        .context("unable to determine cache directory")?;
    let path = proj.cache_dir().to_path_buf();
    std::fs::create_dir_all(&path).with_context(|| format!("creating cache dir: {}", path.display()))?;
    Ok(path)
}

/// Amara API key and username, read from a file holding `API_KEY USERNAME`.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub username: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("username", &self.username).finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(key), Some(user)) => Ok(Self { api_key: key.to_string(), username: user.to_string() }),
            _ => bail!("credentials must contain `API_KEY USERNAME`"),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }
}

/// First line of the password file, without the line terminator.
pub fn read_password(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read password file: {}", path.display()))?;
    Ok(text.lines().next().unwrap_or_default().to_string())
}
