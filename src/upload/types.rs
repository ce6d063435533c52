use crate::error::{Result, UploadError};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Replace every run of whitespace in a file name with a single underscore.
///
/// Applying it twice gives the same result as applying it once.
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut in_whitespace = false;

    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                sanitized.push('_');
                in_whitespace = true;
            }
        } else {
            sanitized.push(c);
            in_whitespace = false;
        }
    }

    sanitized
}

/// A file selected for upload: its bytes, name and MIME type
#[derive(Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub name: String,
    pub content_type: String,
    pub content: Bytes,
}

impl fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDescriptor")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.content.len())
            .finish()
    }
}

impl FileDescriptor {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Load a file from disk, guessing its MIME type from the extension
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                UploadError::invalid_parameter(
                    "path",
                    format!("Path has no usable file name: {}", path.display()),
                )
            })?
            .to_string();

        let content = tokio::fs::read(path).await?;

        let content_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        Ok(Self::new(name, content_type, content))
    }

    /// The name used on the wire, both in the signing query and the form
    pub fn sanitized_name(&self) -> String {
        sanitize_name(&self.name)
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A shared handle onto a file selection.
///
/// Clones observe the same selection. The coordinator takes a snapshot of
/// the current contents when it starts.
#[derive(Debug, Clone, Default)]
pub struct FileList {
    files: Arc<Mutex<Vec<FileDescriptor>>>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, file: FileDescriptor) {
        self.files.lock().push(file);
    }

    /// Replace the whole selection
    pub fn set(&self, files: Vec<FileDescriptor>) {
        *self.files.lock() = files;
    }

    pub fn clear(&self) {
        self.files.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }

    /// Snapshot of the current selection
    pub fn files(&self) -> Vec<FileDescriptor> {
        self.files.lock().clone()
    }
}

impl From<Vec<FileDescriptor>> for FileList {
    fn from(files: Vec<FileDescriptor>) -> Self {
        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }
}

/// Authorization issued by the signing server for one file.
///
/// Only the fields the storage POST needs are required. Anything else the
/// server sends is kept in `extra` and handed to `on_finish` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResult {
    pub signed_url: String,
    pub key: String,
    pub access_key: String,
    pub policy: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Lifecycle of one file's upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Pending,
    Authorizing,
    Transferring,
    Done,
    Failed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Failed | SessionState::Aborted
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Pending => write!(f, "pending"),
            SessionState::Authorizing => write!(f, "authorizing"),
            SessionState::Transferring => write!(f, "transferring"),
            SessionState::Done => write!(f, "done"),
            SessionState::Failed => write!(f, "failed"),
            SessionState::Aborted => write!(f, "aborted"),
        }
    }
}
