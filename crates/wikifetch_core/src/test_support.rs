use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use reqwest::Url;
use serde_json::{Value, json};

use crate::http::WikiHttp;
use crate::pacing::{Pacer, PauseKind};

/// In-memory wiki: parse envelopes keyed by `page`, image bodies keyed by URL.
#[derive(Default)]
pub struct MockHttp {
    pub pages: BTreeMap<String, Value>,
    pub images: BTreeMap<String, Vec<u8>>,
    pub json_requests: Vec<String>,
    pub byte_requests: Vec<String>,
}

impl MockHttp {
    pub fn with_page(mut self, title: &str, display_title: &str, html: &str) -> Self {
        self.pages.insert(
            title.to_string(),
            json!({
                "parse": {
                    "title": display_title,
                    "pageid": 1,
                    "text": { "*": html }
                }
            }),
        );
        self
    }

    pub fn with_error(mut self, title: &str) -> Self {
        self.pages.insert(
            title.to_string(),
            json!({
                "error": {
                    "code": "missingtitle",
                    "info": "The page you specified doesn't exist."
                }
            }),
        );
        self
    }

    pub fn with_image(mut self, url: &str, size: usize) -> Self {
        self.images.insert(url.to_string(), vec![0x89; size]);
        self
    }
}

impl WikiHttp for MockHttp {
    fn get_json(&mut self, url: &Url) -> Result<Value> {
        self.json_requests.push(url.to_string());
        let page = url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| anyhow!("missing page parameter in {url}"))?;
        self.pages
            .get(&page)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused for {page}"))
    }

    fn get_bytes(&mut self, url: &Url) -> Result<Vec<u8>> {
        self.byte_requests.push(url.to_string());
        self.images
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("HTTP 404 while fetching {url}"))
    }

    fn request_count(&self) -> usize {
        self.json_requests.len() + self.byte_requests.len()
    }
}

#[derive(Default)]
pub struct RecordingPacer {
    pub pauses: Vec<PauseKind>,
}

impl RecordingPacer {
    pub fn count(&self, kind: PauseKind) -> usize {
        self.pauses.iter().filter(|pause| **pause == kind).count()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, kind: PauseKind) {
        self.pauses.push(kind);
    }
}
