//! Caller-facing callbacks
//!
//! Outcomes of an upload are never returned to the caller directly. Each
//! session reports through an [`UploadCallbacks`] set: progress updates, a
//! terminal error or a terminal completion carrying the authorization used.
//! Unset callbacks fall back to logging.

use crate::error::UploadError;
use crate::upload::types::AuthorizationResult;
use std::fmt;
use std::sync::Arc;

/// Status label reported alongside a progress percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressStatus {
    Waiting,
    Uploading,
    Finalizing,
    Completed,
}

impl ProgressStatus {
    /// Label for a transfer progress percentage
    pub fn for_percent(percent: u8) -> Self {
        if percent == 100 {
            ProgressStatus::Finalizing
        } else {
            ProgressStatus::Uploading
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::Waiting => "Waiting",
            ProgressStatus::Uploading => "Uploading",
            ProgressStatus::Finalizing => "Finalizing",
            ProgressStatus::Completed => "Upload completed.",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ProgressCallback = Arc<dyn Fn(u8, ProgressStatus) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&UploadError) + Send + Sync>;
pub type FinishCallback = Arc<dyn Fn(&AuthorizationResult) + Send + Sync>;

/// The callback set a session reports through
#[derive(Clone)]
pub struct UploadCallbacks {
    pub on_progress: ProgressCallback,
    pub on_error: ErrorCallback,
    pub on_finish: FinishCallback,
}

impl Default for UploadCallbacks {
    fn default() -> Self {
        Self {
            on_progress: Arc::new(|percent, status| {
                log::info!("upload progress: {}% {}", percent, status);
            }),
            on_error: Arc::new(|error| {
                log::error!("upload error: {}", error);
            }),
            on_finish: Arc::new(|result| {
                log::info!(
                    "upload finished: {}",
                    result.public_url.as_deref().unwrap_or(&result.key)
                );
            }),
        }
    }
}

impl fmt::Debug for UploadCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCallbacks").finish_non_exhaustive()
    }
}

impl UploadCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(u8, ProgressStatus) + Send + Sync + 'static,
    {
        self.on_progress = Arc::new(callback);
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&UploadError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(callback);
        self
    }

    pub fn on_finish<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AuthorizationResult) + Send + Sync + 'static,
    {
        self.on_finish = Arc::new(callback);
        self
    }

    pub(crate) fn progress(&self, percent: u8, status: ProgressStatus) {
        (self.on_progress)(percent, status);
    }

    pub(crate) fn error(&self, error: &UploadError) {
        (self.on_error)(error);
    }

    pub(crate) fn finish(&self, result: &AuthorizationResult) {
        (self.on_finish)(result);
    }
}
