use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use artisan_portal::backend::{is_path_segment, RecordSource, RestClient};
use artisan_portal::config::{self, Config};
use artisan_portal::links::{LinkTarget, QrService};
use artisan_portal::model::{Artisan, ListRecord, Status, StatusFilter};
use artisan_portal::profile::{fetch_profile, render_profile};
use artisan_portal::surface;

#[derive(Debug, Parser)]
#[command(about = "Export public artisan profiles to html/profiles/<id>.html")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Artisan to export
    #[arg(long, conflicts_with = "all_approved")]
    id: Option<String>,

    /// Export every approved artisan
    #[arg(long)]
    all_approved: bool,

    /// Count the export as a profile scan
    #[arg(long)]
    count_scan: bool,

    /// Profiles rendered concurrently with --all-approved
    #[arg(long, default_value = "4")]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;
    run(&cfg, &args).await
}

async fn run(cfg: &Config, args: &Args) -> Result<()> {
    let client = RestClient::from_config(cfg)?;
    let table = client.table::<Artisan>(&cfg.backend.tables.artisans);
    let bucket = client.bucket(&cfg.backend.storage_bucket);
    let links = LinkTarget::from_config(cfg)?;
    let qr = QrService::from_config(cfg)?;
    let out_dir = PathBuf::from(cfg.app.resolved_data_dir())
        .join("html")
        .join("profiles");
    surface::write_stylesheet(&out_dir).await?;

    let ids: Vec<String> = if args.all_approved {
        table
            .fetch_records(StatusFilter::Only(Status::Approved))
            .await
            .context("failed to list approved artisans")?
            .iter()
            .map(|a| a.id().to_string())
            .collect()
    } else {
        match &args.id {
            Some(id) => vec![id.clone()],
            None => bail!("pass --id <ARTISAN_ID> or --all-approved"),
        }
    };

    let results: Vec<Result<PathBuf>> = stream::iter(ids)
        .map(|id| {
            let table = &table;
            let bucket = &bucket;
            let links = &links;
            let qr = &qr;
            let client = &client;
            let out_dir = &out_dir;
            async move {
                let result = fetch_profile(table, bucket, Some(id.as_str())).await;
                let page = render_profile(&result, links, qr);
                if page.found && args.count_scan {
                    if let Err(err) = client.record_scan(&id).await {
                        warn!(?err, %id, "failed to count scan");
                    }
                }
                write_profile(out_dir, &id, &page.title, &page.html).await
            }
        })
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;

    let mut written = 0;
    for result in results {
        match result {
            Ok(path) => {
                written += 1;
                println!("Wrote {}", path.display());
            }
            Err(err) => warn!(?err, "failed to write profile"),
        }
    }
    info!(written, "profiles exported");
    Ok(())
}

async fn write_profile(out_dir: &Path, id: &str, title: &str, body: &str) -> Result<PathBuf> {
    let file_name = if is_path_segment(id) {
        format!("{}.html", id)
    } else {
        "not-found.html".to_string()
    };
    let path = out_dir.join(file_name);
    surface::write_page(&path, title, body).await?;
    Ok(path)
}
