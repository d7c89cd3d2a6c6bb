use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::pacing::{DEFAULT_ARTICLE_DELAY_MS, DEFAULT_IMAGE_DELAY_MS, PolitenessPolicy};

pub const DEFAULT_CONFIG_PATH: &str = "wikifetch.toml";
pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_WIKI_HOST: &str = "en.wikipedia.org";
pub const DEFAULT_UPLOAD_HOST: &str = "upload.wikimedia.org";
pub const DEFAULT_USER_AGENT: &str =
    "wikifetch/0.1 (offline reference builder; educational use)";
pub const DEFAULT_CONTENT_DIR: &str = "content/articles";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_MIN_IMAGE_BYTES: usize = 500;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5_000_000;
pub const DEFAULT_MIN_THUMB_WIDTH: u32 = 100;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct WikiFetchConfig {
    #[serde(default)]
    pub fetch: FetchSection,
    #[serde(default)]
    pub pacing: PacingSection,
    #[serde(default)]
    pub catalog: CatalogSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct FetchSection {
    pub api_url: Option<String>,
    pub wiki_host: Option<String>,
    pub upload_host: Option<String>,
    pub user_agent: Option<String>,
    pub content_dir: Option<PathBuf>,
    pub request_timeout_ms: Option<u64>,
    pub image_timeout_ms: Option<u64>,
    pub min_image_bytes: Option<usize>,
    pub max_image_bytes: Option<usize>,
    pub min_thumb_width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PacingSection {
    pub article_delay_ms: Option<u64>,
    pub image_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct CatalogSection {
    #[serde(default)]
    pub articles: Vec<String>,
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
}

/// Load and parse a WikiFetchConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<WikiFetchConfig> {
    if !config_path.exists() {
        return Ok(WikiFetchConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: WikiFetchConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

/// Load a config file the user named explicitly; a missing file is an error.
pub fn load_explicit_config(config_path: &Path) -> Result<WikiFetchConfig> {
    if !config_path.is_file() {
        bail!("config file not found: {}", config_path.display());
    }
    load_config(config_path)
}

/// Effective settings after layering defaults, config file and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub api_url: String,
    pub wiki_host: String,
    pub upload_host: String,
    pub user_agent: String,
    pub content_dir: PathBuf,
    pub request_timeout: Duration,
    pub image_timeout: Duration,
    pub min_image_bytes: usize,
    pub max_image_bytes: usize,
    pub min_thumb_width: u32,
    pub pacing: PolitenessPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            wiki_host: DEFAULT_WIKI_HOST.to_string(),
            upload_host: DEFAULT_UPLOAD_HOST.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            image_timeout: Duration::from_millis(DEFAULT_IMAGE_TIMEOUT_MS),
            min_image_bytes: DEFAULT_MIN_IMAGE_BYTES,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            min_thumb_width: DEFAULT_MIN_THUMB_WIDTH,
            pacing: PolitenessPolicy::default(),
        }
    }
}

impl FetchSettings {
    pub fn resolve(config: &WikiFetchConfig) -> Result<Self> {
        Self::resolve_with_lookup(config, |key| env::var(key).ok())
    }

    /// Precedence per key: env > config > default.
    pub fn resolve_with_lookup<F>(config: &WikiFetchConfig, lookup_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = &config.fetch;
        let text = |key: &str, configured: &Option<String>, default: &str| {
            lookup_env(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .or_else(|| configured.clone())
                .unwrap_or_else(|| default.to_string())
        };
        let millis = |key: &str, configured: Option<u64>, default: u64| -> Result<u64> {
            match lookup_env(key) {
                Some(value) if !value.trim().is_empty() => value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid {key}: {value}")),
                _ => Ok(configured.unwrap_or(default)),
            }
        };

        let content_dir = lookup_env("WIKIFETCH_CONTENT_DIR")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| fetch.content_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR));

        let settings = Self {
            api_url: text("WIKIFETCH_API_URL", &fetch.api_url, DEFAULT_API_URL),
            wiki_host: text("WIKIFETCH_WIKI_HOST", &fetch.wiki_host, DEFAULT_WIKI_HOST),
            upload_host: text(
                "WIKIFETCH_UPLOAD_HOST",
                &fetch.upload_host,
                DEFAULT_UPLOAD_HOST,
            ),
            user_agent: text("WIKIFETCH_USER_AGENT", &fetch.user_agent, DEFAULT_USER_AGENT),
            content_dir,
            request_timeout: Duration::from_millis(millis(
                "WIKIFETCH_HTTP_TIMEOUT_MS",
                fetch.request_timeout_ms,
                DEFAULT_REQUEST_TIMEOUT_MS,
            )?),
            image_timeout: Duration::from_millis(millis(
                "WIKIFETCH_IMAGE_TIMEOUT_MS",
                fetch.image_timeout_ms,
                DEFAULT_IMAGE_TIMEOUT_MS,
            )?),
            min_image_bytes: fetch.min_image_bytes.unwrap_or(DEFAULT_MIN_IMAGE_BYTES),
            max_image_bytes: fetch.max_image_bytes.unwrap_or(DEFAULT_MAX_IMAGE_BYTES),
            min_thumb_width: fetch.min_thumb_width.unwrap_or(DEFAULT_MIN_THUMB_WIDTH),
            pacing: PolitenessPolicy {
                image_interval: Duration::from_millis(millis(
                    "WIKIFETCH_IMAGE_DELAY_MS",
                    config.pacing.image_delay_ms,
                    DEFAULT_IMAGE_DELAY_MS,
                )?),
                article_interval: Duration::from_millis(millis(
                    "WIKIFETCH_ARTICLE_DELAY_MS",
                    config.pacing.article_delay_ms,
                    DEFAULT_ARTICLE_DELAY_MS,
                )?),
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.min_image_bytes >= self.max_image_bytes {
            bail!(
                "min_image_bytes ({}) must be smaller than max_image_bytes ({})",
                self.min_image_bytes,
                self.max_image_bytes
            );
        }
        if self.wiki_host.contains('/') || self.upload_host.contains('/') {
            bail!("wiki_host and upload_host must be bare host names");
        }
        if self.request_timeout.is_zero() || self.image_timeout.is_zero() {
            bail!("HTTP timeouts must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/wikifetch.toml")).expect("load config");
        assert_eq!(config, WikiFetchConfig::default());
    }

    #[test]
    fn explicit_config_must_exist() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("typo.toml");
        let error = load_explicit_config(&missing).expect_err("must fail");
        assert!(error.to_string().contains("config file not found"));

        let present = temp.path().join("wikifetch.toml");
        fs::write(&present, "[pacing]\nimage_delay_ms = 0\n").expect("write config");
        let config = load_explicit_config(&present).expect("load config");
        assert_eq!(config.pacing.image_delay_ms, Some(0));
    }

    #[test]
    fn load_config_parses_all_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("wikifetch.toml");
        fs::write(
            &config_path,
            r#"
[fetch]
api_url = "https://wiki.example.org/w/api.php"
wiki_host = "wiki.example.org"
content_dir = "out/articles"
min_image_bytes = 100
max_image_bytes = 2000

[pacing]
article_delay_ms = 0
image_delay_ms = 5

[catalog]
articles = ["Balun", "FT8"]

[catalog.categories]
Balun = "electronics"
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(
            config.fetch.api_url.as_deref(),
            Some("https://wiki.example.org/w/api.php")
        );
        assert_eq!(config.fetch.content_dir, Some(PathBuf::from("out/articles")));
        assert_eq!(config.pacing.image_delay_ms, Some(5));
        assert_eq!(config.catalog.articles, vec!["Balun", "FT8"]);
        assert_eq!(
            config.catalog.categories.get("Balun").map(String::as_str),
            Some("electronics")
        );
    }

    #[test]
    fn load_config_tolerates_partial_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("wikifetch.toml");
        fs::write(&config_path, "[pacing]\narticle_delay_ms = 250\n").expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert!(config.fetch.api_url.is_none());
        assert!(config.catalog.articles.is_empty());
        assert_eq!(config.pacing.article_delay_ms, Some(250));
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("wikifetch.toml");
        fs::write(&config_path, "[fetch\napi_url = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn resolve_without_overrides_uses_defaults() {
        let settings =
            FetchSettings::resolve_with_lookup(&WikiFetchConfig::default(), |_| None)
                .expect("resolve");
        assert_eq!(settings, FetchSettings::default());
        assert_eq!(settings.content_dir, PathBuf::from("content/articles"));
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.image_timeout, Duration::from_secs(15));
    }

    #[test]
    fn resolve_prefers_env_over_config() {
        let config = WikiFetchConfig {
            fetch: FetchSection {
                user_agent: Some("from-config/1.0".to_string()),
                content_dir: Some(PathBuf::from("config-dir")),
                ..FetchSection::default()
            },
            pacing: PacingSection {
                article_delay_ms: Some(2_000),
                image_delay_ms: None,
            },
            ..WikiFetchConfig::default()
        };
        let env = HashMap::from([
            ("WIKIFETCH_USER_AGENT".to_string(), " from-env/2.0 ".to_string()),
            ("WIKIFETCH_ARTICLE_DELAY_MS".to_string(), "0".to_string()),
        ]);

        let settings = FetchSettings::resolve_with_lookup(&config, |key| env.get(key).cloned())
            .expect("resolve");
        assert_eq!(settings.user_agent, "from-env/2.0");
        assert_eq!(settings.content_dir, PathBuf::from("config-dir"));
        assert_eq!(settings.pacing.article_interval, Duration::ZERO);
        assert_eq!(settings.pacing.image_interval, Duration::from_millis(100));
    }

    #[test]
    fn resolve_rejects_unparseable_env_numbers() {
        let env = HashMap::from([(
            "WIKIFETCH_HTTP_TIMEOUT_MS".to_string(),
            "soon".to_string(),
        )]);
        let error = FetchSettings::resolve_with_lookup(&WikiFetchConfig::default(), |key| {
            env.get(key).cloned()
        })
        .expect_err("must fail");
        assert!(error.to_string().contains("WIKIFETCH_HTTP_TIMEOUT_MS"));
    }

    #[test]
    fn resolve_rejects_inverted_size_bounds() {
        let config = WikiFetchConfig {
            fetch: FetchSection {
                min_image_bytes: Some(10_000),
                max_image_bytes: Some(1_000),
                ..FetchSection::default()
            },
            ..WikiFetchConfig::default()
        };
        let error = FetchSettings::resolve_with_lookup(&config, |_| None).expect_err("must fail");
        assert!(error.to_string().contains("min_image_bytes"));
    }
}
