//! Record list view: snapshot, filters and rendering for one screen.
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::backend::{MediaStore, NoMedia, RecordSource};
use crate::error::ViewError;
use crate::filter::{CategoryFilter, FilterState};
use crate::links::{LinkTarget, QrService};
use crate::model::{Artisan, ListRecord, Status, StatusFilter};
use crate::render::{self, RowTemplate, SurfaceContent};
use crate::surface::{DisplaySurface, Notifier, NotifyKind};

/// What happened to a finished `load()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response replaced the snapshot; carries the snapshot size.
    Applied(usize),
    /// A later `load()` was started before this one resolved.
    Superseded,
    /// The view was torn down while the request was in flight.
    Discarded,
}

struct ViewState<R> {
    records: Vec<R>,
    status_filter: StatusFilter,
    filters: FilterState,
    rendered_ok: bool,
    /// Message of the most recent failed load, kept while nothing has rendered.
    last_error: Option<String>,
}

pub struct RecordListView<R: ListRecord> {
    source: Arc<dyn RecordSource<R>>,
    media: Arc<dyn MediaStore>,
    surface: Arc<dyn DisplaySurface>,
    notifier: Arc<dyn Notifier>,
    template: Box<dyn RowTemplate<R>>,
    state: Mutex<ViewState<R>>,
    generation: AtomicU64,
    torn_down: AtomicBool,
}

impl<R: ListRecord> RecordListView<R> {
    pub fn new(
        source: Arc<dyn RecordSource<R>>,
        surface: Arc<dyn DisplaySurface>,
        notifier: Arc<dyn Notifier>,
        template: Box<dyn RowTemplate<R>>,
    ) -> Self {
        Self {
            source,
            media: Arc::new(NoMedia),
            surface,
            notifier,
            template,
            state: Mutex::new(ViewState {
                records: Vec::new(),
                status_filter: StatusFilter::All,
                filters: FilterState::default(),
                rendered_ok: false,
                last_error: None,
            }),
            generation: AtomicU64::new(0),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Resolve derived media fields through `media` after each fetch.
    pub fn with_media(mut self, media: Arc<dyn MediaStore>) -> Self {
        self.media = media;
        self
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Stop the view: in-flight continuations no longer touch state,
    /// the surface or the notifier.
    pub fn teardown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!("view torn down");
    }

    /// Fetch the records in the current status scope and re-render.
    ///
    /// Overlapping calls resolve last-initiated-wins: a response whose call
    /// was overtaken by a newer one is dropped.
    #[instrument(skip_all)]
    pub async fn load(&self) -> Result<LoadOutcome, ViewError> {
        if self.is_torn_down() {
            return Ok(LoadOutcome::Discarded);
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let filter = self.state.lock().await.status_filter;

        let result = self.source.fetch_records(filter).await;

        if self.is_torn_down() {
            debug!(generation, "dropping response after teardown");
            return Ok(LoadOutcome::Discarded);
        }
        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "dropping superseded response");
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(rows) => {
                let mut rows = dedupe(rows);
                for row in rows.iter_mut() {
                    row.enrich(self.media.as_ref());
                }
                state.records = rows;
                let visible = state.filters.apply(&state.records);
                self.show(render::render_list(&visible, self.template.as_ref()));
                state.rendered_ok = true;
                state.last_error = None;
                info!(
                    total = state.records.len(),
                    visible = visible.len(),
                    ?filter,
                    "snapshot replaced"
                );
                Ok(LoadOutcome::Applied(state.records.len()))
            }
            Err(err) => {
                let view_err = ViewError::fetch(&err);
                warn!(?err, "load failed; keeping previous snapshot");
                self.notifier.notify(&view_err.to_string(), NotifyKind::Error);
                if !state.rendered_ok {
                    let message = view_err.to_string();
                    self.show(render::render_error(&message, self.template.as_ref()));
                    state.last_error = Some(message);
                }
                Err(view_err)
            }
        }
    }

    /// Narrow `records` with the current search and category filters.
    pub async fn apply_filters(&self, records: &[R]) -> Vec<R> {
        self.state.lock().await.filters.apply(records)
    }

    /// Fully replace the surface with `records`, in the given order.
    pub fn render(&self, records: &[R]) {
        self.show(render::render_list(records, self.template.as_ref()));
    }

    fn show(&self, content: SurfaceContent) {
        if self.is_torn_down() {
            return;
        }
        if let Err(err) = self.surface.replace(content) {
            warn!(?err, "failed to update display surface");
        }
    }

    /// Change the fetch scope and refetch.
    pub async fn set_status_filter(&self, filter: StatusFilter) -> Result<LoadOutcome, ViewError> {
        self.state.lock().await.status_filter = filter;
        self.load().await
    }

    /// Change the search term and re-render from the snapshot; no refetch.
    /// Returns the number of visible records. Before the first successful
    /// load only the filter state changes.
    pub async fn set_search_term(&self, term: &str) -> usize {
        let mut state = self.state.lock().await;
        state.filters.set_search(term);
        self.rerender(&state)
    }

    /// Change the categorical filter and re-render from the snapshot.
    pub async fn set_category_filter(&self, category: CategoryFilter) -> usize {
        let mut state = self.state.lock().await;
        state.filters.category = category;
        self.rerender(&state)
    }

    fn rerender(&self, state: &ViewState<R>) -> usize {
        if !state.rendered_ok {
            // Keep the failure banner; an empty snapshot is not "no records".
            if let Some(message) = &state.last_error {
                self.show(render::render_error(message, self.template.as_ref()));
            }
            return 0;
        }
        let visible = state.filters.apply(&state.records);
        self.render(&visible);
        visible.len()
    }

    /// Ask the source to move record `id` to `status`, then resynchronise.
    #[instrument(skip(self))]
    pub async fn request_status_change(&self, id: &str, status: Status) -> Result<(), ViewError> {
        if self.is_torn_down() {
            return Err(ViewError::UpdateFailure("view is closed".to_string()));
        }
        let known = self
            .state
            .lock()
            .await
            .records
            .iter()
            .any(|r| r.id() == id);
        if !known {
            let err = ViewError::UpdateFailure(format!("no record with ID '{}' in the current list", id));
            self.notify_unless_torn_down(&err.to_string(), NotifyKind::Error);
            return Err(err);
        }

        if let Err(err) = self.source.update_status(id, status).await {
            let view_err = ViewError::update(&err);
            warn!(?err, "status update failed");
            self.notify_unless_torn_down(&view_err.to_string(), NotifyKind::Error);
            return Err(view_err);
        }
        if self.is_torn_down() {
            return Ok(());
        }

        self.notifier.notify(
            &format!(
                "{} successfully {}.",
                R::NOUN,
                status.as_str().to_lowercase()
            ),
            NotifyKind::Success,
        );
        // A failed refresh is already reported by `load`; the update itself stands.
        if let Err(err) = self.load().await {
            debug!(%err, "refresh after status change failed");
        }
        Ok(())
    }

    fn notify_unless_torn_down(&self, message: &str, kind: NotifyKind) {
        if !self.is_torn_down() {
            self.notifier.notify(message, kind);
        }
    }

    /// Look `id` up in the current snapshot; never refetches.
    pub async fn detail(&self, id: &str) -> Result<R, ViewError> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| ViewError::NotFound(id.to_string()))
    }

    pub async fn snapshot(&self) -> Vec<R> {
        self.state.lock().await.records.clone()
    }

    /// Currently visible records.
    pub async fn visible(&self) -> Vec<R> {
        let state = self.state.lock().await;
        state.filters.apply(&state.records)
    }

    pub async fn status_filter(&self) -> StatusFilter {
        self.state.lock().await.status_filter
    }

    pub async fn search_term(&self) -> String {
        self.state.lock().await.filters.search().to_string()
    }
}

impl RecordListView<Artisan> {
    /// Admin detail panel for `id`, or a "not found" panel.
    pub async fn detail_html(&self, id: &str, links: &LinkTarget, qr: &QrService) -> String {
        match self.detail(id).await {
            Ok(artisan) => render::render_detail(&artisan, links, qr),
            Err(err) => {
                debug!(%err, "detail lookup missed");
                render::render_detail_not_found(id)
            }
        }
    }
}

/// Keep the first row per identifier.
fn dedupe<R: ListRecord>(rows: Vec<R>) -> Vec<R> {
    let mut seen = HashSet::new();
    let total = rows.len();
    let unique: Vec<R> = rows
        .into_iter()
        .filter(|r| seen.insert(r.id().to_string()))
        .collect();
    if unique.len() != total {
        warn!(dropped = total - unique.len(), "duplicate identifiers in response");
    }
    unique
}
