//! Error taxonomy for site lookup, rendering and writing.

use std::path::PathBuf;
use std::sync::Arc;

/// Error type returned by user-supplied data, bulk data and render functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by [`Site`](crate::Site) operations.
///
/// The type is cheaply cloneable: cached computations hand the same outcome
/// to every caller waiting on them.
#[derive(Clone, Debug, thiserror::Error)]
pub enum SiteError {
    /// No route handles the path (404), or a route matched but failed to
    /// render it (500, `cause` is set).
    #[error(
        "Could not look up file for path `{path}`{}",
        .cause.as_ref().map(|c| format!(": {c}")).unwrap_or_default()
    )]
    NotFound {
        /// Path that was looked up or rendered.
        path: String,
        /// Underlying failure when the route matched but rendering failed.
        #[source]
        cause: Option<Arc<SiteError>>,
    },
    /// A user-supplied data or render function failed.
    #[error(transparent)]
    Callback(Arc<dyn std::error::Error + Send + Sync + 'static>),
    /// Writing a rendered file to disk failed.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        /// Destination file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl SiteError {
    /// Pure "page does not exist" error for `path`.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            cause: None,
        }
    }

    /// "Page exists but could not be rendered" error for `path`.
    #[must_use]
    pub fn render_failed(path: impl Into<String>, cause: SiteError) -> Self {
        Self::NotFound {
            path: path.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// Whether this is a [`SiteError::NotFound`], with or without a cause.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is a [`SiteError::NotFound`] carrying a render failure.
    pub fn is_render_failure(&self) -> bool {
        matches!(self, Self::NotFound { cause: Some(_), .. })
    }

    /// Underlying render failure of a [`SiteError::NotFound`].
    pub fn cause(&self) -> Option<&SiteError> {
        match self {
            Self::NotFound { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

impl From<BoxError> for SiteError {
    /// Wraps a user error, unless the user raised a [`SiteError`] itself.
    fn from(err: BoxError) -> Self {
        match err.downcast::<SiteError>() {
            Ok(site_error) => *site_error,
            Err(other) => Self::Callback(Arc::from(other)),
        }
    }
}
