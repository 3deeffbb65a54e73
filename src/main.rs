use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use artisan_portal::backend::RestClient;
use artisan_portal::config::{self, Config};
use artisan_portal::filter::CategoryFilter;
use artisan_portal::links::{LinkTarget, QrService};
use artisan_portal::model::{Artisan, Craft, Status, StatusFilter};
use artisan_portal::render::{AdminRow, CraftCard};
use artisan_portal::surface::{self, HtmlFileSurface, ToastBoard};
use artisan_portal::view::RecordListView;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Export the artisan admin dashboard and craft directory as static HTML"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export the admin dashboard to html/admin.html
    Admin {
        /// Fetch scope: All, Pending, Approved or Rejected
        #[arg(long, default_value = "All")]
        status: StatusFilter,

        /// Case-insensitive search over name and place
        #[arg(long, default_value = "")]
        search: String,

        /// Only show artisans with a place set
        #[arg(long)]
        has_region: bool,

        /// Also export the detail panel for this artisan to html/details.html
        #[arg(long)]
        details: Option<String>,
    },
    /// Approve an artisan and re-export the dashboard
    Approve {
        #[arg(long)]
        id: String,
    },
    /// Reject an artisan and re-export the dashboard
    Reject {
        #[arg(long)]
        id: String,
    },
    /// Export the public craft directory to html/crafts.html
    Crafts {
        #[arg(long, default_value = "")]
        search: String,
    },
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

    let html_dir = PathBuf::from(cfg.app.resolved_data_dir()).join("html");
    surface::write_stylesheet(&html_dir).await?;
    let toasts = Arc::new(ToastBoard::new(cfg.app.notify_dismiss()));

    let result = match args.command {
        Command::Admin {
            status,
            search,
            has_region,
            details,
        } => {
            let category = if has_region {
                CategoryFilter::HasRegion
            } else {
                CategoryFilter::All
            };
            export_admin(&cfg, &html_dir, toasts.clone(), status, &search, category, details).await
        }
        Command::Approve { id } => change_status(&cfg, &html_dir, toasts.clone(), &id, Status::Approved).await,
        Command::Reject { id } => change_status(&cfg, &html_dir, toasts.clone(), &id, Status::Rejected).await,
        Command::Crafts { search } => export_crafts(&cfg, &html_dir, toasts.clone(), &search).await,
    };

    for toast in toasts.active() {
        println!("[{}] {}", toast.kind.as_str(), toast.message);
    }
    if let Err(err) = &result {
        error!(?err, "command failed");
    }
    result
}

fn admin_view(cfg: &Config, html_dir: &Path, toasts: Arc<ToastBoard>) -> Result<RecordListView<Artisan>> {
    let client = RestClient::from_config(cfg)?;
    let table = client.table::<Artisan>(&cfg.backend.tables.artisans);
    let bucket = client.bucket(&cfg.backend.storage_bucket);
    let view = RecordListView::new(
        Arc::new(table),
        Arc::new(HtmlFileSurface::admin_table(html_dir.join("admin.html"))),
        toasts,
        Box::new(AdminRow {
            links: LinkTarget::from_config(cfg)?,
        }),
    )
    .with_media(Arc::new(bucket));
    Ok(view)
}

async fn export_admin(
    cfg: &Config,
    html_dir: &Path,
    toasts: Arc<ToastBoard>,
    status: StatusFilter,
    search: &str,
    category: CategoryFilter,
    details: Option<String>,
) -> Result<()> {
    let view = admin_view(cfg, html_dir, toasts)?;
    // Nothing is written until the first load lands.
    view.set_search_term(search).await;
    view.set_category_filter(category).await;
    let outcome = view.set_status_filter(status).await?;
    info!(?outcome, visible = view.visible().await.len(), "admin dashboard exported");

    if let Some(id) = details {
        let links = LinkTarget::from_config(cfg)?;
        let qr = QrService::from_config(cfg)?;
        let panel = view.detail_html(&id, &links, &qr).await;
        let path = html_dir.join("details.html");
        surface::write_page(&path, "Artisan Details", &panel).await?;
        println!("Wrote {}", path.display());
    }
    view.teardown();
    println!("Wrote {}", html_dir.join("admin.html").display());
    Ok(())
}

async fn change_status(
    cfg: &Config,
    html_dir: &Path,
    toasts: Arc<ToastBoard>,
    id: &str,
    status: Status,
) -> Result<()> {
    let view = admin_view(cfg, html_dir, toasts)?;
    view.load().await?;
    view.request_status_change(id, status).await?;
    view.teardown();
    Ok(())
}

async fn export_crafts(
    cfg: &Config,
    html_dir: &Path,
    toasts: Arc<ToastBoard>,
    search: &str,
) -> Result<()> {
    let client = RestClient::from_config(cfg)?;
    let view = RecordListView::<Craft>::new(
        Arc::new(client.table::<Craft>(&cfg.backend.tables.crafts)),
        Arc::new(HtmlFileSurface::craft_list(html_dir.join("crafts.html"))),
        toasts,
        Box::new(CraftCard),
    );
    view.set_search_term(search).await;
    let outcome = view.load().await?;
    info!(?outcome, "craft directory exported");
    view.teardown();
    println!("Wrote {}", html_dir.join("crafts.html").display());
    Ok(())
}
