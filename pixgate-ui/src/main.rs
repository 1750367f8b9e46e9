//! pixgate - command line front-end of the image screening tool
//!
//! Subcommands:
//! - `upload`: stage images, submit them as one batch, show the gallery
//! - `gallery`: list the images of one page layout
//! - `filter`: run the brightness filter pass over every resized image

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pixgate_common::config::ConfigResolver;
use pixgate_common::{CapacityPolicy, EventBus, PixgateEvent};
use pixgate_ui::{AppContext, CandidateInput, GalleryLayout, GalleryLists, GalleryViewer, UploadManager};
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "pixgate", version, about = "Upload and screen images against a pixgate backend")]
struct Cli {
    /// Backend base URL (overrides PIXGATE_API_BASE and the config file)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Config file (default: ~/.config/pixgate/config.toml)
    #[arg(long, global = true, env = "PIXGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload images as one batch
    Upload {
        /// Image files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Overflow behavior when more files than the cap are given
        #[arg(long)]
        policy: Option<CapacityPolicy>,

        /// Batch capacity
        #[arg(long)]
        max_files: Option<usize>,
    },

    /// Show the gallery lists of a page layout
    Gallery {
        #[arg(long, default_value_t = GalleryLayout::Uploads)]
        layout: GalleryLayout,
    },

    /// Run the brightness filter pass over all resized images
    Filter,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level: RUST_LOG, then `[logging] level` from the config file
    let resolver = ConfigResolver::new(cli.api_base.as_deref(), cli.config.as_deref());
    let default_level = resolver.toml().logging.level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting pixgate v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    resolver.log_load_outcome();

    let mut config = resolver.resolve()?;
    if let Command::Upload {
        policy, max_files, ..
    } = &cli.command
    {
        if let Some(policy) = policy {
            config = config.with_capacity_policy(*policy);
        }
        if let Some(max_files) = max_files {
            config = config.with_max_files(*max_files);
        }
    }
    info!(api_base = %config.api_base, "Using backend");

    let ctx = AppContext::new(config)?;
    let progress = spawn_progress_printer(&ctx.events);

    let outcome = match cli.command {
        Command::Upload { files, .. } => run_upload(&ctx, files, cli.json).await,
        Command::Gallery { layout } => run_gallery(&ctx, layout, cli.json).await,
        Command::Filter => run_filter(&ctx, cli.json).await,
    };

    progress.abort();
    outcome
}

async fn run_upload(ctx: &AppContext, paths: Vec<PathBuf>, json: bool) -> Result<()> {
    let gallery = GalleryViewer::new(ctx, GalleryLayout::Uploads);
    let manager = UploadManager::new(ctx);

    let report = gallery.refresh().await;
    if !report.is_complete() {
        warn!("Gallery could not be loaded; continuing with upload");
    }

    let mut candidates = Vec::with_capacity(paths.len());
    for path in &paths {
        match CandidateInput::from_path(path).await {
            Ok(input) => candidates.push(input),
            Err(e) => warn!(path = %path.display(), error = %e, "Cannot read file; skipping"),
        }
    }

    let added = manager.add_files(candidates).await?;
    info!(
        admitted = added.admitted,
        skipped = added.skipped,
        ignored = added.filtered_out,
        "Batch staged ({}/{})",
        manager.len().await,
        manager.max_files()
    );

    let mut uploaded_urls = Vec::new();
    manager
        .submit(|items| uploaded_urls = items.iter().map(|item| item.url.clone()).collect())
        .await
        .context("Upload failed")?;
    eprintln!();

    gallery.prepend_uploaded(&uploaded_urls).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "uploaded": uploaded_urls,
                "gallery": gallery.lists().await,
            }))?
        );
    } else {
        println!("Uploaded {} images:", uploaded_urls.len());
        for url in &uploaded_urls {
            println!("  {}", url);
        }
        print_lists(&gallery.lists().await, GalleryLayout::Uploads);
    }
    Ok(())
}

async fn run_gallery(ctx: &AppContext, layout: GalleryLayout, json: bool) -> Result<()> {
    let gallery = GalleryViewer::new(ctx, layout);
    let report = gallery.refresh().await;
    for (list, reason) in &report.failed {
        eprintln!("Could not load {} images: {}", list, reason);
    }

    let lists = gallery.lists().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&lists)?);
    } else {
        print_lists(&lists, layout);
    }
    Ok(())
}

async fn run_filter(ctx: &AppContext, json: bool) -> Result<()> {
    let gallery = GalleryViewer::new(ctx, GalleryLayout::Screening);
    gallery.refresh().await;
    let all = gallery.all().await;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current image");
            on_ctrl_c.cancel();
        }
    });

    let report = gallery.run_filter_pass(&all, &cancel).await;
    eprintln!();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "report": report,
                "gallery": gallery.lists().await,
            }))?
        );
    } else {
        println!(
            "Checked {} of {} images ({} skipped){}",
            report.checked,
            report.total,
            report.skipped,
            if report.cancelled { ", cancelled" } else { "" }
        );
        print_lists(&gallery.lists().await, GalleryLayout::Screening);
    }
    Ok(())
}

fn print_lists(lists: &GalleryLists, layout: GalleryLayout) {
    use pixgate_common::GalleryList;

    for list in GalleryList::ALL {
        if layout.source(list).is_none() {
            continue;
        }
        let urls = lists.get(list);
        println!("{} images ({}):", list, urls.len());
        if urls.is_empty() {
            println!("  (none)");
        }
        for url in urls {
            println!("  {}", url);
        }
    }
}

/// Render progress and notices on stderr while a command runs
fn spawn_progress_printer(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(PixgateEvent::UploadProgress { percent, .. }) => {
                    eprint!("\rUploading... {:>3}%", percent);
                }
                Ok(PixgateEvent::FilterProgress {
                    completed,
                    total,
                    percent,
                    ..
                }) => {
                    eprint!("\rScreening... {}/{} ({:>3}%)", completed, total, percent);
                }
                Ok(PixgateEvent::Notice { level, message, .. }) => {
                    eprintln!("[{}] {}", level, message);
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
