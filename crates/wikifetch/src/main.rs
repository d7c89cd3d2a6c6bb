use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use wikifetch_core::article::{ArticleFetcher, ArticleOutcome};
use wikifetch_core::batch::{run_batch, run_single};
use wikifetch_core::catalog::Catalog;
use wikifetch_core::config::{
    DEFAULT_CONFIG_PATH, FetchSettings, WikiFetchConfig, load_config, load_explicit_config,
};
use wikifetch_core::http::HttpClient;
use wikifetch_core::layout::OutputLayout;
use wikifetch_core::logging::init_logging;
use wikifetch_core::pacing::{PolitenessPolicy, SleepPacer};

#[derive(Debug, Parser)]
#[command(
    name = "wikifetch",
    version,
    about = "Fetch wiki articles with their images into an offline HTML tree"
)]
struct Cli {
    #[arg(
        value_name = "TITLE",
        help = "Fetch a single title instead of the whole catalog"
    )]
    title: Option<String>,
    #[arg(long, value_name = "PATH", help = "Config file (default: wikifetch.toml)")]
    config: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "Output root for articles and images")]
    content_dir: Option<PathBuf>,
    #[arg(long, help = "Skip the pauses between images and articles")]
    no_delay: bool,
    #[arg(long, help = "Print the resolved catalog and exit")]
    list: bool,
    #[arg(short, long, help = "Log per-image details")]
    verbose: bool,
    #[arg(long, help = "Print the batch summary as JSON")]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging(cli.verbose)?;

    let config = load_cli_config(cli.config.as_deref())?;
    let mut settings = FetchSettings::resolve(&config)?;
    if let Some(content_dir) = &cli.content_dir {
        settings.content_dir = content_dir.clone();
    }
    if cli.no_delay {
        settings.pacing = PolitenessPolicy::disabled();
    }
    let catalog = Catalog::from_config(&config.catalog)?;
    let layout = OutputLayout::new(&settings.content_dir);

    if cli.list {
        return run_list(&catalog, &layout);
    }

    let client = HttpClient::new(&settings)?;
    let pacer = SleepPacer::new(settings.pacing);
    let mut fetcher = ArticleFetcher::new(client, pacer, &settings, layout.images_dir())?;

    match cli.title {
        Some(title) => run_single_title(&mut fetcher, &catalog, &layout, &title),
        None => run_full_batch(&mut fetcher, &catalog, &layout, cli.json),
    }
}

fn run_full_batch(
    fetcher: &mut ArticleFetcher<HttpClient, SleepPacer>,
    catalog: &Catalog,
    layout: &OutputLayout,
    as_json: bool,
) -> Result<()> {
    let report = run_batch(fetcher, catalog, layout)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("{report}");
        println!("content_dir: {}", normalize_path(layout.root()));
    }
    Ok(())
}

fn run_single_title(
    fetcher: &mut ArticleFetcher<HttpClient, SleepPacer>,
    catalog: &Catalog,
    layout: &OutputLayout,
    title: &str,
) -> Result<()> {
    match run_single(fetcher, catalog, layout, title)? {
        ArticleOutcome::Written {
            title,
            path,
            images,
        } => {
            println!("fetched: {title}");
            println!("path: {}", normalize_path(&path));
            println!("images: {images}");
        }
        ArticleOutcome::Failed { reason } => {
            println!("failed: {}", title.trim());
            println!("reason: {reason}");
        }
    }
    Ok(())
}

fn run_list(catalog: &Catalog, layout: &OutputLayout) -> Result<()> {
    println!("catalog.count: {}", catalog.len());
    for spec in catalog.specs() {
        println!(
            "{}\t{}\t{}",
            spec.title,
            spec.category.as_str(),
            normalize_path(&layout.article_path(&spec))
        );
    }
    Ok(())
}

/// `--config` and `WIKIFETCH_CONFIG` must name an existing file; only the
/// implicit default may be absent.
fn load_cli_config(flag: Option<&Path>) -> Result<WikiFetchConfig> {
    let explicit = flag.map(Path::to_path_buf).or_else(|| {
        env::var("WIKIFETCH_CONFIG")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    });
    match explicit {
        Some(path) => load_explicit_config(&path),
        None => load_config(Path::new(DEFAULT_CONFIG_PATH)),
    }
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
