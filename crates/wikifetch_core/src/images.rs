use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use reqwest::Url;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::FetchSettings;
use crate::http::WikiHttp;
use crate::layout::write_atomic;

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];
pub const DEFAULT_IMAGE_EXTENSION: &str = ".png";
pub const IMAGE_FILENAME_PREFIX: &str = "img_";
const HASH_HEX_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// `cached` is true when the file was already on disk and no request was made.
    Localized { filename: String, cached: bool },
    Unavailable { reason: String },
}

impl ImageOutcome {
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Localized { filename, .. } => Some(filename.as_str()),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Download cache for article images, keyed on the normalized source URL.
#[derive(Debug, Clone)]
pub struct ImageCache {
    images_dir: PathBuf,
    wiki_host: String,
    min_bytes: usize,
    max_bytes: usize,
}

impl ImageCache {
    pub fn new(images_dir: impl Into<PathBuf>, settings: &FetchSettings) -> Self {
        Self {
            images_dir: images_dir.into(),
            wiki_host: settings.wiki_host.clone(),
            min_bytes: settings.min_image_bytes,
            max_bytes: settings.max_image_bytes,
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Never fails: every error becomes `ImageOutcome::Unavailable`.
    pub fn fetch<A: WikiHttp>(&self, api: &mut A, raw_url: &str) -> ImageOutcome {
        match self.try_fetch(api, raw_url) {
            Ok(outcome) => outcome,
            Err(error) => {
                debug!(url = raw_url, "image unavailable: {error:#}");
                ImageOutcome::Unavailable {
                    reason: format!("{error:#}"),
                }
            }
        }
    }

    pub fn accepts_size(&self, len: usize) -> bool {
        self.min_bytes < len && len < self.max_bytes
    }

    fn try_fetch<A: WikiHttp>(&self, api: &mut A, raw_url: &str) -> Result<ImageOutcome> {
        let url = normalize_image_url(raw_url, &self.wiki_host)?;
        let filename = local_image_filename(&url);
        let local_path = self.images_dir.join(&filename);
        if local_path.exists() {
            return Ok(ImageOutcome::Localized {
                filename,
                cached: true,
            });
        }

        let bytes = api.get_bytes(&url)?;
        if !self.accepts_size(bytes.len()) {
            bail!(
                "image size {} bytes outside accepted range ({}, {})",
                bytes.len(),
                self.min_bytes,
                self.max_bytes
            );
        }
        write_atomic(&local_path, &bytes)
            .with_context(|| format!("failed to store image {filename}"))?;
        debug!(url = %url, filename = %filename, bytes = bytes.len(), "image stored");
        Ok(ImageOutcome::Localized {
            filename,
            cached: false,
        })
    }
}

/// Promote protocol-relative and root-relative URLs to absolute https URLs.
pub fn normalize_image_url(raw_url: &str, wiki_host: &str) -> Result<Url> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        bail!("empty image URL");
    }
    let absolute = if trimmed.starts_with("//") {
        format!("https:{trimmed}")
    } else if trimmed.starts_with('/') {
        format!("https://{wiki_host}{trimmed}")
    } else {
        trimmed.to_string()
    };
    Url::parse(&absolute).with_context(|| format!("invalid image URL: {raw_url}"))
}

/// `img_<12 hex chars of sha256(url)><ext>`; depends only on the URL.
pub fn local_image_filename(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let mut hash = String::with_capacity(HASH_HEX_LEN);
    for byte in digest.iter().take(HASH_HEX_LEN / 2) {
        hash.push_str(&format!("{byte:02x}"));
    }
    format!(
        "{IMAGE_FILENAME_PREFIX}{hash}{}",
        image_extension(url.path())
    )
}

fn image_extension(path: &str) -> String {
    let last_segment = path.rsplit('/').next().unwrap_or("");
    let extension = match last_segment.rfind('.') {
        Some(index) if index > 0 => last_segment[index..].to_ascii_lowercase(),
        _ => return DEFAULT_IMAGE_EXTENSION.to_string(),
    };
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        extension
    } else {
        DEFAULT_IMAGE_EXTENSION.to_string()
    }
}
