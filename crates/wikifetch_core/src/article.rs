use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Url;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::FetchSettings;
use crate::http::WikiHttp;
use crate::images::ImageCache;
use crate::layout::write_atomic;
use crate::pacing::{Pacer, PauseKind};
use crate::transform::ContentTransformer;

pub const SITE_NAME: &str = "Ham Radio Encyclopedia";
pub const STYLESHEET_PATH: &str = "../css/style.css";
pub const INDEX_PATH: &str = "../index.html";
pub const LICENSE_NAME: &str = "CC BY-SA 4.0";
pub const LICENSE_URL: &str = "https://creativecommons.org/licenses/by-sa/4.0/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArticle {
    pub title: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Written {
        title: String,
        path: PathBuf,
        images: usize,
    },
    Failed {
        reason: String,
    },
}

impl ArticleOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Fetch -> transform -> render -> write, for one title at a time.
pub struct ArticleFetcher<A: WikiHttp, P: Pacer> {
    api: A,
    pacer: P,
    api_url: String,
    wiki_host: String,
    transformer: ContentTransformer,
    images: ImageCache,
}

impl<A: WikiHttp, P: Pacer> ArticleFetcher<A, P> {
    pub fn new(
        api: A,
        pacer: P,
        settings: &FetchSettings,
        images_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            api,
            pacer,
            api_url: settings.api_url.clone(),
            wiki_host: settings.wiki_host.clone(),
            transformer: ContentTransformer::new(
                &settings.upload_host,
                settings.min_thumb_width,
            )?,
            images: ImageCache::new(images_dir, settings),
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub fn pause(&mut self, kind: PauseKind) {
        self.pacer.pause(kind);
    }

    /// Errors are logged and reported as `ArticleOutcome::Failed`; the
    /// output file is either left untouched or replaced by a complete page.
    pub fn fetch_article(&mut self, title: &str, output_path: &Path) -> ArticleOutcome {
        info!("fetching {title}");
        match self.try_fetch_article(title, output_path) {
            Ok((page_title, images)) => {
                info!("saved {} ({images} images)", output_path.display());
                ArticleOutcome::Written {
                    title: page_title,
                    path: output_path.to_path_buf(),
                    images,
                }
            }
            Err(error) => {
                warn!("failed to fetch {title}: {error:#}");
                ArticleOutcome::Failed {
                    reason: format!("{error:#}"),
                }
            }
        }
    }

    fn try_fetch_article(&mut self, title: &str, output_path: &Path) -> Result<(String, usize)> {
        let request_url = parse_request_url(&self.api_url, title)?;
        let payload = self.api.get_json(&request_url)?;
        let article = parse_article_envelope(&payload)
            .with_context(|| format!("no article for {title}"))?;

        let Self {
            api,
            pacer,
            wiki_host,
            transformer,
            images,
            ..
        } = self;
        let output = transformer.transform(
            &article.html,
            |url| images.fetch(&mut *api, url),
            &mut *pacer,
        );

        let page = render_page(&article.title, &output.html, wiki_host);
        write_atomic(output_path, page.as_bytes())?;
        Ok((article.title, output.localized_images))
    }
}

/// `action=parse` request for a single title. The title is passed through
/// as given, so pre-encoded titles such as `Ohm%27s_law` reach the API
/// unchanged.
pub fn parse_request_url(api_url: &str, title: &str) -> Result<Url> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        bail!("article title is empty");
    }
    let mut url =
        Url::parse(api_url).with_context(|| format!("invalid wiki API URL: {api_url}"))?;
    url.set_query(Some(&format!(
        "action=parse&page={}&format=json&prop=text&disableeditsection=true&disabletoc=false",
        encode_title_param(trimmed)
    )));
    Ok(url)
}

fn encode_title_param(title: &str) -> String {
    let mut output = String::with_capacity(title.len());
    for ch in title.chars() {
        match ch {
            ' ' => output.push('_'),
            '&' => output.push_str("%26"),
            '+' => output.push_str("%2B"),
            '#' => output.push_str("%23"),
            '=' => output.push_str("%3D"),
            _ => output.push(ch),
        }
    }
    output
}

/// Extract `parse.title` and the body HTML, accepting both the legacy
/// `{"text": {"*": ...}}` and the formatversion=2 `{"text": "..."}` shapes.
pub fn parse_article_envelope(payload: &Value) -> Result<ParsedArticle> {
    if let Some(error) = payload.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("unknown info");
        bail!("wiki API error [{code}]: {info}");
    }
    let parse = payload
        .get("parse")
        .ok_or_else(|| anyhow!("invalid parse response shape"))?;
    let title = parse
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("parse response has no title"))?
        .to_string();
    let html = match parse.get("text") {
        Some(Value::String(text)) => text.clone(),
        Some(text) => text
            .get("*")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("parse response has no text"))?
            .to_string(),
        None => bail!("parse response has no text"),
    };
    Ok(ParsedArticle { title, html })
}

/// Standalone page around an already-transformed body. Only `body` is
/// inserted without escaping.
pub fn render_page(title: &str, body: &str, wiki_host: &str) -> String {
    let escaped_title = escape_html(title);
    let source_url = escape_html(&format!(
        "https://{wiki_host}/wiki/{}",
        title.replace(' ', "_")
    ));
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{escaped_title} - {SITE_NAME}</title>
    <link rel="stylesheet" href="{STYLESHEET_PATH}">
</head>
<body>
    <nav class="breadcrumb">
        <a href="{INDEX_PATH}">Home</a> &gt; {escaped_title}
    </nav>
    <article>
        <h1>{escaped_title}</h1>
        {body}
        <footer class="attribution">
            <p>Content from <a href="{source_url}">Wikipedia</a>,
            licensed under <a href="{LICENSE_URL}">{LICENSE_NAME}</a>.</p>
        </footer>
    </article>
    <nav class="bottom-nav">
        <a href="{INDEX_PATH}">&larr; Back to Index</a>
    </nav>
</body>
</html>
"#
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
