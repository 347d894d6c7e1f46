use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use channel_catalog::{
    config::Config,
    models::SourceOrigin,
    services::CatalogService,
    sources::SourceFormat,
    streaming::{BatchRunner, LivenessProber, ManifestResolver, ResolutionCache},
    utils::{FetchPipeline, TextFetcher},
};

#[derive(Parser)]
#[command(name = "channel-catalog")]
#[command(version)]
#[command(about = "Import, resolve, probe and combine live channel playlists")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import playlists or feeds (URLs or local files) and print the catalog
    Import {
        inputs: Vec<String>,

        /// Only keep channels matching this name
        #[arg(short, long)]
        filter: Option<String>,

        /// Print an M3U playlist instead of JSON
        #[arg(long)]
        m3u: bool,
    },
    /// Resolve adaptive stream URLs to playable locations
    Resolve { urls: Vec<String> },
    /// Import inputs and probe every channel for reachability
    Probe {
        inputs: Vec<String>,

        /// Drop channels found dead and print the remaining playlist
        #[arg(long)]
        remove_dead: bool,
    },
    /// Group channels that appear in several inputs
    Combine {
        inputs: Vec<String>,

        #[arg(long, default_value_t = 2)]
        min_sources: usize,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cancel `token` on Ctrl-C so batches stop at the next slice boundary
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing current slice");
            token.cancel();
        }
    });
}

async fn load_inputs(catalog: &CatalogService, inputs: &[String]) -> Result<()> {
    for input in inputs {
        if input.starts_with("http://") || input.starts_with("https://") {
            let summary = catalog.import_remote(input, input).await?;
            info!("{}: {} channels", input, summary.channel_count);
            continue;
        }

        let content = tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {input}"))?;
        let name = Path::new(input)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.clone());
        let summary = match SourceFormat::detect(&content) {
            SourceFormat::Feed => {
                catalog
                    .import_feed(&name, SourceOrigin::UploadedText, &content)
                    .await?
            }
            SourceFormat::Playlist => {
                catalog
                    .import_playlist(&name, SourceOrigin::UploadedText, &content)
                    .await?
            }
        };
        info!("{}: {} channels", name, summary.channel_count);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("channel_catalog={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Starting channel-catalog v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    let fetcher: Arc<dyn TextFetcher> = Arc::new(FetchPipeline::from_config(&config.fetch));
    let catalog = CatalogService::from_config(fetcher.clone(), &config.fetch);
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    match cli.command {
        Command::Import { inputs, filter, m3u } => {
            load_inputs(&catalog, &inputs).await?;
            let channels = match filter {
                Some(pattern) => catalog.filter(&pattern).await,
                None => catalog.active_channels().await,
            };
            if m3u {
                print!("{}", channel_catalog::proxy::generate_m3u(&channels));
            } else {
                print_json(&channels)?;
            }
        }
        Command::Resolve { urls } => {
            let resolver = ManifestResolver::from_config(
                fetcher,
                Arc::new(ResolutionCache::new(config.resolution.cache_ttl)),
                &config.resolution,
            );
            let total = urls.len();
            let outcome = BatchRunner::new(config.resolution.concurrency)
                .run(
                    urls,
                    &cancel,
                    |url| {
                        let resolver = &resolver;
                        async move { resolver.resolve_stream(&url).await }
                    },
                    |done, result| debug!("[{}/{}] {:?}", done, total, result.kind),
                )
                .await;
            print_json(&outcome.results)?;
        }
        Command::Probe {
            inputs,
            remove_dead,
        } => {
            load_inputs(&catalog, &inputs).await?;
            let channels = catalog.active_channels().await;
            let total = channels.len();
            let prober = LivenessProber::from_config(&config.liveness);
            let outcome = prober
                .check_channels(&channels, &cancel.child_token(), |done, result| {
                    debug!("[{}/{}] alive={}", done, total, result.alive)
                })
                .await;
            catalog.apply_liveness(&outcome.results).await;

            if remove_dead {
                let removed = catalog.remove_dead_channels().await;
                info!("Removed {} dead channels", removed);
                print!("{}", catalog.export_m3u().await);
            } else {
                print_json(&outcome.results)?;
            }
        }
        Command::Combine {
            inputs,
            min_sources,
        } => {
            load_inputs(&catalog, &inputs).await?;
            print_json(&catalog.combine(min_sources).await)?;
        }
    }

    Ok(())
}
