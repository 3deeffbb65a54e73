use thiserror::Error;

/// Failures surfaced by the list view and profile pages.
///
/// None of these are fatal: callers turn them into a notification or a
/// degraded render.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("Error fetching data: {0}")]
    FetchFailure(String),
    #[error("Error updating status: {0}")]
    UpdateFailure(String),
    #[error("record '{0}' not found")]
    NotFound(String),
    #[error("malformed {field}: {reason}")]
    MalformedAuxiliaryField { field: &'static str, reason: String },
}

impl ViewError {
    /// Flatten an `anyhow` chain into a single human-readable message.
    pub fn fetch(err: &anyhow::Error) -> Self {
        ViewError::FetchFailure(format!("{:#}", err))
    }

    pub fn update(err: &anyhow::Error) -> Self {
        ViewError::UpdateFailure(format!("{:#}", err))
    }
}
