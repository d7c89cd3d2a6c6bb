use std::fmt;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::article::{ArticleFetcher, ArticleOutcome};
use crate::catalog::{Catalog, Category};
use crate::http::WikiHttp;
use crate::layout::OutputLayout;
use crate::pacing::{Pacer, PauseKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub fetched: usize,
    pub failed: usize,
    pub images: usize,
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fetch complete: {} articles, {} failed, {} images",
            self.fetched, self.failed, self.images
        )
    }
}

/// Fetch every catalog title in order, pausing between articles whatever
/// the outcome. Only layout and final image-count failures abort the run.
pub fn run_batch<A: WikiHttp, P: Pacer>(
    fetcher: &mut ArticleFetcher<A, P>,
    catalog: &Catalog,
    layout: &OutputLayout,
) -> Result<FetchReport> {
    layout.prepare(&Category::ALL)?;
    info!("starting fetch of {} articles", catalog.len());

    let mut report = FetchReport::default();
    for spec in catalog.specs() {
        let output_path = layout.article_path(&spec);
        match fetcher.fetch_article(&spec.title, &output_path) {
            ArticleOutcome::Written { .. } => report.fetched += 1,
            ArticleOutcome::Failed { .. } => report.failed += 1,
        }
        fetcher.pause(PauseKind::Article);
    }

    report.images = layout.count_images()?;
    info!(
        "batch finished after {} HTTP requests",
        fetcher.api().request_count()
    );
    Ok(report)
}

/// Fetch one title with the same category and slug rules as the batch,
/// without pacing.
pub fn run_single<A: WikiHttp, P: Pacer>(
    fetcher: &mut ArticleFetcher<A, P>,
    catalog: &Catalog,
    layout: &OutputLayout,
    title: &str,
) -> Result<ArticleOutcome> {
    let spec = catalog.spec_for(title.trim());
    layout.prepare(&[spec.category])?;
    let output_path = layout.article_path(&spec);
    Ok(fetcher.fetch_article(&spec.title, &output_path))
}
