use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::images::ImageOutcome;
use crate::pacing::{Pacer, PauseKind};

pub const LOCAL_IMAGE_PREFIX: &str = "../images/";
pub const INTERNAL_LINK_PREFIX: &str = "/wiki/";

static THUMB_WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)px-").expect("thumb width pattern"));
static SRCSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s*srcset="[^"]*""#).expect("srcset pattern"));
static EDITSECTION_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="mw-editsection">"#).expect("editsection pattern")
});
static SPAN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<span\b[^>]*>|</span\s*>").expect("span tag pattern"));
static UNLOCALIZED_IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]*\ssrc="/[^"]*"[^>]*>"#).expect("img pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub html: String,
    pub localized_images: usize,
}

#[derive(Debug, Clone)]
pub struct ContentTransformer {
    upload_src: Regex,
    min_thumb_width: u32,
}

impl ContentTransformer {
    pub fn new(upload_host: &str, min_thumb_width: u32) -> Result<Self> {
        let pattern = format!(r#"src="(//{}[^"]*)""#, regex::escape(upload_host));
        let upload_src = Regex::new(&pattern)
            .with_context(|| format!("failed to build image pattern for {upload_host}"))?;
        Ok(Self {
            upload_src,
            min_thumb_width,
        })
    }

    /// Distinct upload-host image URLs worth fetching, in document order.
    pub fn candidate_image_urls(&self, body: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for captures in self.upload_src.captures_iter(body) {
            let url = &captures[1];
            if is_small_thumbnail(url, self.min_thumb_width) {
                continue;
            }
            if seen.insert(url.to_string()) {
                urls.push(url.to_string());
            }
        }
        urls
    }

    /// Localize images through `localize`, then strip markup that has no
    /// offline meaning. Image tags still pointing at `/` or `//` are removed.
    pub fn transform<F, P>(&self, body: &str, mut localize: F, pacer: &mut P) -> TransformOutput
    where
        F: FnMut(&str) -> ImageOutcome,
        P: Pacer,
    {
        let mut html = body.to_string();
        let mut localized_images = 0usize;

        for url in self.candidate_image_urls(body) {
            match localize(&url) {
                ImageOutcome::Localized { filename, cached } => {
                    let source = format!(r#"src="{url}""#);
                    localized_images += html.matches(&source).count();
                    html = html.replace(
                        &source,
                        &format!(r#"src="{LOCAL_IMAGE_PREFIX}{filename}""#),
                    );
                    if !cached {
                        pacer.pause(PauseKind::Image);
                    }
                }
                ImageOutcome::Unavailable { .. } => {}
            }
        }

        let html = strip_srcset(&html);
        let html = strip_editsections(&html);
        let html = rewrite_internal_links(&html);
        let html = strip_unlocalized_images(&html);
        TransformOutput {
            html,
            localized_images,
        }
    }
}

/// True when a `/thumb/` URL carries a `<N>px-` hint below `min_width`.
pub fn is_small_thumbnail(url: &str, min_width: u32) -> bool {
    if !url.contains("/thumb/") {
        return false;
    }
    THUMB_WIDTH_RE
        .captures(url)
        .and_then(|captures| captures[1].parse::<u32>().ok())
        .is_some_and(|width| width < min_width)
}

pub fn strip_srcset(html: &str) -> String {
    SRCSET_RE.replace_all(html, "").into_owned()
}

/// Remove each edit-section span up to its balanced closing tag, nested
/// bracket spans included. An unclosed span leaves the rest untouched.
pub fn strip_editsections(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0usize;
    while let Some(open) = EDITSECTION_OPEN_RE.find_at(html, cursor) {
        let Some(close) = balanced_span_end(html, open.end()) else {
            break;
        };
        out.push_str(&html[cursor..open.start()]);
        cursor = close;
    }
    out.push_str(&html[cursor..]);
    out
}

/// Byte offset just past the `</span>` closing a span opened before `from`.
fn balanced_span_end(html: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for tag in SPAN_TAG_RE.find_iter(&html[from..]) {
        if tag.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Some(from + tag.end());
            }
        } else {
            depth += 1;
        }
    }
    None
}

pub fn rewrite_internal_links(html: &str) -> String {
    html.replace(&format!(r#"href="{INTERNAL_LINK_PREFIX}"#), r#"href=""#)
}

pub fn strip_unlocalized_images(html: &str) -> String {
    UNLOCALIZED_IMG_RE.replace_all(html, "").into_owned()
}
