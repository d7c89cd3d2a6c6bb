use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::FetchSettings;

/// Network seam for the pipeline. Both calls are single attempts; callers
/// decide what a failure means.
pub trait WikiHttp {
    fn get_json(&mut self, url: &Url) -> Result<Value>;
    fn get_bytes(&mut self, url: &Url) -> Result<Vec<u8>>;
    fn request_count(&self) -> usize;
}

pub struct HttpClient {
    client: Client,
    user_agent: String,
    request_timeout: Duration,
    image_timeout: Duration,
    max_image_bytes: usize,
    request_count: usize,
}

impl HttpClient {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            user_agent: settings.user_agent.clone(),
            request_timeout: settings.request_timeout,
            image_timeout: settings.image_timeout,
            max_image_bytes: settings.max_image_bytes,
            request_count: 0,
        })
    }
}

impl WikiHttp for HttpClient {
    fn get_json(&mut self, url: &Url) -> Result<Value> {
        self.request_count += 1;
        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", self.user_agent.clone())
            .timeout(self.request_timeout)
            .send()
            .with_context(|| format!("failed to call {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} while fetching {}", status.as_u16(), url);
        }
        response
            .json::<Value>()
            .context("failed to decode wiki API JSON response")
    }

    fn get_bytes(&mut self, url: &Url) -> Result<Vec<u8>> {
        self.request_count += 1;
        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", self.user_agent.clone())
            .header("Accept", "image/*")
            .timeout(self.image_timeout)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {} while fetching {}", status.as_u16(), url);
        }
        check_declared_length(response.content_length(), self.max_image_bytes)
            .with_context(|| format!("refusing {url}"))?;
        // Reading max bytes is enough for the caller's strict size gate to reject.
        let mut bytes = Vec::new();
        response
            .take(self.max_image_bytes as u64)
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read body of {url}"))?;
        Ok(bytes)
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

/// Reject a body whose declared length already reaches the image ceiling.
pub fn check_declared_length(declared: Option<u64>, max_bytes: usize) -> Result<()> {
    match declared {
        Some(len) if len >= max_bytes as u64 => {
            bail!("declared length {len} bytes exceeds limit of {max_bytes}")
        }
        _ => Ok(()),
    }
}
