//! Upload configuration
//!
//! [`UploadConfig`] carries everything a batch needs: where to ask for
//! authorizations, which extra query parameters and headers to send, the
//! file source and the callbacks. The serializable part round trips through
//! JSON; callbacks and files are attached with builder methods.

use crate::callback::{ProgressStatus, UploadCallbacks};
use crate::error::{Result, UploadError};
use crate::upload::types::{AuthorizationResult, FileDescriptor, FileList};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub const DEFAULT_SIGNING_URL: &str = "/sign-s3";

/// Header sent with the storage POST when no upload headers are configured
pub const DEFAULT_ACL_HEADER: (&str, &str) = ("x-amz-acl", "public-read");

/// Configuration for a batch of uploads
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Endpoint issuing upload authorizations (default: /sign-s3)
    #[serde(rename = "signing-url")]
    pub signing_url: String,

    /// Base URL a relative signing URL is resolved against
    #[serde(rename = "base-url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Extra query parameters appended to the signing request, in order
    #[serde(
        rename = "signing-url-query-params",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub signing_url_query_params: Vec<(String, String)>,

    /// Headers sent with the signing request, in order
    #[serde(
        rename = "signing-url-headers",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub signing_url_headers: Vec<(String, String)>,

    /// Headers sent with the storage POST; when unset a public-read ACL
    /// header is sent instead
    #[serde(rename = "upload-request-headers", skip_serializing_if = "Option::is_none")]
    pub upload_request_headers: Option<Vec<(String, String)>>,

    /// Upper bound on sessions running at once (default: unbounded)
    #[serde(rename = "max-concurrent-uploads", skip_serializing_if = "Option::is_none")]
    pub max_concurrent_uploads: Option<usize>,

    #[serde(skip)]
    pub file_list: Option<FileList>,

    #[serde(skip)]
    pub files: Vec<FileDescriptor>,

    #[serde(skip)]
    pub callbacks: UploadCallbacks,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            signing_url: DEFAULT_SIGNING_URL.to_string(),
            base_url: None,
            signing_url_query_params: Vec::new(),
            signing_url_headers: Vec::new(),
            upload_request_headers: None,
            max_concurrent_uploads: None,
            file_list: None,
            files: Vec::new(),
            callbacks: UploadCallbacks::default(),
        }
    }
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("signing_url", &self.signing_url)
            .field("base_url", &self.base_url)
            .field("signing_url_query_params", &self.signing_url_query_params)
            .field("signing_url_headers", &self.signing_url_headers)
            .field("upload_request_headers", &self.upload_request_headers)
            .field("max_concurrent_uploads", &self.max_concurrent_uploads)
            .field("file_list", &self.file_list.as_ref().map(FileList::len))
            .field("files", &self.files.len())
            .finish()
    }
}

impl UploadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration from `S3_UPLOAD_SIGNING_URL`, `S3_UPLOAD_BASE_URL` and
    /// `S3_UPLOAD_MAX_CONCURRENT`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(signing_url) = std::env::var("S3_UPLOAD_SIGNING_URL") {
            config.signing_url = signing_url;
        }

        if let Ok(base_url) = std::env::var("S3_UPLOAD_BASE_URL") {
            config.base_url = Some(base_url);
        }

        if let Ok(max) = std::env::var("S3_UPLOAD_MAX_CONCURRENT") {
            let max = max.parse::<usize>().map_err(|e| {
                UploadError::invalid_parameter("S3_UPLOAD_MAX_CONCURRENT", e.to_string())
            })?;
            config.max_concurrent_uploads = Some(max);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn signing_url<S: Into<String>>(mut self, url: S) -> Self {
        self.signing_url = url.into();
        self
    }

    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn signing_url_query_param<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.signing_url_query_params.push((key.into(), value.into()));
        self
    }

    pub fn signing_url_header<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.signing_url_headers.push((key.into(), value.into()));
        self
    }

    /// Add a storage POST header. Once any is set the default ACL header is
    /// no longer sent.
    pub fn upload_request_header<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.upload_request_headers
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    pub fn max_concurrent_uploads(mut self, max: usize) -> Self {
        self.max_concurrent_uploads = Some(max);
        self
    }

    pub fn file_list(mut self, list: FileList) -> Self {
        self.file_list = Some(list);
        self
    }

    pub fn files(mut self, files: Vec<FileDescriptor>) -> Self {
        self.files = files;
        self
    }

    pub fn add_file(mut self, file: FileDescriptor) -> Self {
        self.files.push(file);
        self
    }

    pub fn callbacks(mut self, callbacks: UploadCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(u8, ProgressStatus) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_progress(callback);
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&UploadError) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_error(callback);
        self
    }

    pub fn on_finish<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AuthorizationResult) + Send + Sync + 'static,
    {
        self.callbacks = self.callbacks.on_finish(callback);
        self
    }

    /// The effective file source: the handle's current files if a handle is
    /// set, otherwise the explicit list.
    pub fn resolve_files(&self) -> Vec<FileDescriptor> {
        match &self.file_list {
            Some(list) => list.files(),
            None => self.files.clone(),
        }
    }

    /// Absolute URL of the signing endpoint
    pub fn resolve_signing_url(&self) -> Result<Url> {
        let resolved = match &self.base_url {
            Some(base) => Url::parse(base).and_then(|base| base.join(&self.signing_url)),
            None => Url::parse(&self.signing_url),
        };

        resolved.map_err(|e| {
            UploadError::config_error(format!(
                "Cannot resolve signing URL '{}': {}",
                self.signing_url, e
            ))
        })
    }

    /// Headers for the storage POST
    pub fn effective_upload_headers(&self) -> Vec<(String, String)> {
        match &self.upload_request_headers {
            Some(headers) => headers.clone(),
            None => vec![(
                DEFAULT_ACL_HEADER.0.to_string(),
                DEFAULT_ACL_HEADER.1.to_string(),
            )],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.signing_url.trim().is_empty() {
            return Err(UploadError::invalid_parameter(
                "signing_url",
                "Signing URL cannot be empty",
            ));
        }

        if self.max_concurrent_uploads == Some(0) {
            return Err(UploadError::invalid_parameter(
                "max_concurrent_uploads",
                "Concurrency cap must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Convert the configuration to a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(UploadError::from)
    }

    /// Create a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(UploadError::from)
    }
}
