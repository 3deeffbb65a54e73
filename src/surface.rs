//! Display and notification surfaces the views write into.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

use crate::render::{html_escape, SurfaceContent, SurfaceState};

/// Mount point whose content is fully replaced on every render.
pub trait DisplaySurface: Send + Sync {
    fn replace(&self, content: SurfaceContent) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
}

impl NotifyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyKind::Success => "success",
            NotifyKind::Error => "error",
        }
    }
}

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NotifyKind);
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keeps every replacement in memory.
#[derive(Debug, Default)]
pub struct MemorySurface {
    history: Mutex<Vec<SurfaceContent>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<SurfaceContent> {
        lock(&self.history).last().cloned()
    }

    pub fn current_state(&self) -> Option<SurfaceState> {
        lock(&self.history).last().map(|c| c.state)
    }

    pub fn render_count(&self) -> usize {
        lock(&self.history).len()
    }
}

impl DisplaySurface for MemorySurface {
    fn replace(&self, content: SurfaceContent) -> Result<()> {
        lock(&self.history).push(content);
        Ok(())
    }
}

/// Writes a complete HTML document around the rendered rows.
#[derive(Debug, Clone)]
pub struct HtmlFileSurface {
    path: PathBuf,
    title: String,
    open: String,
    close: String,
}

impl HtmlFileSurface {
    pub fn new(path: impl Into<PathBuf>, title: &str, open: &str, close: &str) -> Self {
        Self {
            path: path.into(),
            title: title.to_string(),
            open: open.to_string(),
            close: close.to_string(),
        }
    }

    /// Admin dashboard table.
    pub fn admin_table(path: impl Into<PathBuf>) -> Self {
        Self::new(
            path,
            "Artisan Admin",
            r#"<table class="artisan-table">
  <thead><tr><th>Name</th><th>Place</th><th>Phone</th><th>Aadhaar (Last 4)</th><th>Status</th><th>Actions</th></tr></thead>
  <tbody id="artisan-table-body">"#,
            "  </tbody>\n</table>",
        )
    }

    /// Public craft directory list.
    pub fn craft_list(path: impl Into<PathBuf>) -> Self {
        Self::new(path, "Crafts", r#"<ul id="crafts-list">"#, "</ul>")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn document(&self, content: &SurfaceContent) -> String {
        page(&self.title, &format!("{}\n{}\n{}", self.open, content.html, self.close))
    }
}

impl DisplaySurface for HtmlFileSurface {
    fn replace(&self, content: SurfaceContent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, self.document(&content))
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(path = %self.path.display(), state = ?content.state, "page written");
        Ok(())
    }
}

/// Standalone HTML document linking the shared stylesheet.
pub fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{}</title>
    <link rel="stylesheet" href="static/style.css">
  </head>
  <body>
    <main>
{}
    </main>
  </body>
</html>"#,
        html_escape(title),
        body
    )
}

/// Write the shared stylesheet next to the exported pages.
pub async fn write_stylesheet(html_dir: &Path) -> Result<PathBuf> {
    let static_dir = html_dir.join("static");
    tokio::fs::create_dir_all(&static_dir)
        .await
        .with_context(|| format!("failed to create {}", static_dir.display()))?;
    let css_path = static_dir.join("style.css");
    tokio::fs::write(&css_path, DEFAULT_STYLE)
        .await
        .with_context(|| format!("failed to write {}", css_path.display()))?;
    Ok(css_path)
}

/// Write a standalone page built with [`page`].
pub async fn write_page(path: &Path, title: &str, body: &str) -> Result<()> {
    tokio::fs::write(path, page(title, body))
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "page written");
    Ok(())
}

const DEFAULT_STYLE: &str = r#"
:root {
  color-scheme: light dark;
  --fg: #222;
  --bg: #fff;
  --muted: #666;
}

@media (prefers-color-scheme: dark) {
  :root {
    --fg: #eee;
    --bg: #121212;
    --muted: #aaa;
  }
}

body {
  margin: 0;
  background: var(--bg);
  color: var(--fg);
  font: 14px/1.6 -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
}

main {
  padding: 16px;
  max-width: 960px;
  margin: 0 auto;
}

.status-badge { padding: 2px 8px; border-radius: 10px; }
.status-pending { background: #fff3bf; color: #8a6d00; }
.status-approved { background: #d3f9d8; color: #2b8a3e; }
.status-rejected { background: #ffe3e3; color: #c92a2a; }

.error-banner { color: #c92a2a; font-weight: 600; }

.craft-item img,
.gallery-item img,
.image-grid img {
  max-width: 100%;
  display: block;
}

.gallery-more summary {
  cursor: pointer;
  margin: 8px 0;
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: NotifyKind,
    pub shown_at: DateTime<Utc>,
    pub dismiss_at: DateTime<Utc>,
}

/// Toast notifications that dismiss themselves after a fixed duration.
#[derive(Debug)]
pub struct ToastBoard {
    dismiss_after: chrono::Duration,
    toasts: Mutex<Vec<Toast>>,
}

impl ToastBoard {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            dismiss_after: chrono::Duration::from_std(dismiss_after)
                .unwrap_or_else(|_| chrono::Duration::seconds(3)),
            toasts: Mutex::new(Vec::new()),
        }
    }

    /// Add a toast shown at `now`, dropping any that have already expired.
    pub fn push_at(&self, message: &str, kind: NotifyKind, now: DateTime<Utc>) {
        let mut toasts = lock(&self.toasts);
        toasts.retain(|t| t.dismiss_at > now);
        toasts.push(Toast {
            message: message.to_string(),
            kind,
            shown_at: now,
            dismiss_at: now + self.dismiss_after,
        });
    }

    /// Toasts still visible at `now`; dismissed ones are dropped.
    pub fn active_at(&self, now: DateTime<Utc>) -> Vec<Toast> {
        let mut toasts = lock(&self.toasts);
        toasts.retain(|t| t.dismiss_at > now);
        toasts.clone()
    }

    pub fn active(&self) -> Vec<Toast> {
        self.active_at(Utc::now())
    }

    pub fn latest(&self) -> Option<Toast> {
        lock(&self.toasts).last().cloned()
    }
}

impl Notifier for ToastBoard {
    fn notify(&self, message: &str, kind: NotifyKind) {
        match kind {
            NotifyKind::Success => info!(kind = kind.as_str(), "{}", message),
            NotifyKind::Error => warn!(kind = kind.as_str(), "{}", message),
        }
        self.push_at(message, kind, Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn toasts_dismiss_after_duration() {
        let board = ToastBoard::new(Duration::from_millis(3000));
        let t0 = Utc::now();
        board.push_at("saved", NotifyKind::Success, t0);
        assert_eq!(board.active_at(t0 + chrono::Duration::seconds(2)).len(), 1);
        assert!(board.active_at(t0 + chrono::Duration::seconds(3)).is_empty());
        assert!(board.latest().is_none());
    }

    #[test]
    fn pushing_drops_expired_toasts() {
        let board = ToastBoard::new(Duration::from_secs(3));
        let t0 = Utc::now();
        for i in 0..100 {
            board.push_at("old", NotifyKind::Error, t0 + chrono::Duration::milliseconds(i));
        }
        board.push_at("new", NotifyKind::Success, t0 + chrono::Duration::seconds(10));
        assert_eq!(lock(&board.toasts).len(), 1);
        assert_eq!(board.latest().unwrap().message, "new");
    }

    #[tokio::test]
    async fn stylesheet_and_pages_are_written() {
        let td = tempdir().unwrap();
        let css = write_stylesheet(td.path()).await.unwrap();
        assert_eq!(css, td.path().join("static").join("style.css"));
        assert!(std::fs::read_to_string(&css).unwrap().contains(".gallery-more summary"));

        let page_path = td.path().join("details.html");
        write_page(&page_path, "A & B", "<p>body</p>").await.unwrap();
        let written = std::fs::read_to_string(&page_path).unwrap();
        assert!(written.contains("<title>A &amp; B</title>"));
        assert!(written.contains("<p>body</p>"));
    }

    #[test]
    fn notify_records_kind() {
        let board = ToastBoard::new(Duration::from_secs(60));
        board.notify("Error fetching data: offline", NotifyKind::Error);
        let toast = board.latest().unwrap();
        assert_eq!(toast.kind, NotifyKind::Error);
        assert_eq!(board.active().len(), 1);
    }

    #[test]
    fn file_surface_replaces_whole_document() {
        let td = tempdir().unwrap();
        let surface = HtmlFileSurface::craft_list(td.path().join("html/crafts.html"));
        surface
            .replace(SurfaceContent {
                state: SurfaceState::Rows(1),
                html: "<li>first</li>".into(),
            })
            .unwrap();
        surface
            .replace(SurfaceContent {
                state: SurfaceState::Empty,
                html: "<li>second</li>".into(),
            })
            .unwrap();
        let written = std::fs::read_to_string(surface.path()).unwrap();
        assert!(written.contains("<ul id=\"crafts-list\">\n<li>second</li>\n</ul>"));
        assert!(!written.contains("first"));
        assert!(written.contains("<title>Crafts</title>"));
    }

    #[test]
    fn memory_surface_tracks_latest() {
        let surface = MemorySurface::new();
        assert!(surface.current().is_none());
        surface
            .replace(SurfaceContent {
                state: SurfaceState::Error,
                html: String::new(),
            })
            .unwrap();
        assert_eq!(surface.current_state(), Some(SurfaceState::Error));
        assert_eq!(surface.render_count(), 1);
    }
}
