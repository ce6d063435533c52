//! Network transports
//!
//! Sessions never talk to an HTTP client directly. Each attempt asks a
//! [`CorsTransportFactory`] for a transport; the factory consults the
//! [`TransportCapabilities`] injected for the deployment target, preferring a
//! credentialed cross-origin transport and falling back to a legacy one.

pub mod http;
pub mod progress;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::{AbortHandle, AbortRegistration};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use http::{HttpCapabilities, HttpTransport};
pub use progress::ProgressStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// The binary part of a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    pub file_name: String,
    pub content_type: String,
    pub content: Bytes,
}

/// A multipart form whose fields keep their insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    file: Option<(String, FormFile)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Attach the file part, always sent after the text fields
    pub fn file(mut self, name: impl Into<String>, file: FormFile) -> Self {
        self.file = Some((name.into(), file));
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn file_part(&self) -> Option<(&str, &FormFile)> {
        self.file.as_ref().map(|(name, file)| (name.as_str(), file))
    }

    /// Field names in the order they go on the wire
    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.file.as_ref().map(|(name, _)| name.as_str()))
            .collect()
    }

    pub(crate) fn into_parts(self) -> (Vec<(String, String)>, Option<(String, FormFile)>) {
        (self.fields, self.file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Form(MultipartForm),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.headers.extend(headers);
        self
    }

    pub fn form(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Form(form);
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Final response of a request: status and raw body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Upload progress of a request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    /// Total body size when known
    pub total: Option<u64>,
}

impl ProgressEvent {
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        Self { loaded, total }
    }

    /// Rounded percentage, or `None` when the total is unknown
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(total) if total > 0 => {
                let percent = (self.loaded as f64 / total as f64 * 100.0).round();
                Some(percent.clamp(0.0, 100.0) as u8)
            }
            _ => None,
        }
    }
}

pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Executes one request at a time on behalf of a session
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: TransportRequest,
        progress: Option<ProgressSink>,
    ) -> Result<TransportResponse, TransportError>;
}

/// What a deployment target can offer for cross-origin requests
pub trait TransportCapabilities: Send + Sync {
    /// A transport that can carry credentials across origins
    fn credentialed(&self, method: Method, url: &str) -> Option<Arc<dyn Transport>>;

    /// A legacy cross-domain transport, if the target has one
    fn legacy(&self, _method: Method, _url: &str) -> Option<Arc<dyn Transport>> {
        None
    }
}

/// Picks a usable transport for each attempt
#[derive(Clone)]
pub struct CorsTransportFactory {
    capabilities: Arc<dyn TransportCapabilities>,
}

impl CorsTransportFactory {
    pub fn new(capabilities: Arc<dyn TransportCapabilities>) -> Self {
        Self { capabilities }
    }

    /// Decided afresh on every call; `None` when no transport is usable.
    pub fn create(&self, method: Method, url: &str) -> Option<Arc<dyn Transport>> {
        if let Some(transport) = self.capabilities.credentialed(method, url) {
            return Some(transport);
        }

        match self.capabilities.legacy(method, url) {
            Some(transport) => {
                log::debug!("using legacy cross-domain transport for {} {}", method, url);
                Some(transport)
            }
            None => {
                log::warn!("no cross-origin transport available for {} {}", method, url);
                None
            }
        }
    }
}

impl fmt::Debug for CorsTransportFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorsTransportFactory").finish_non_exhaustive()
    }
}

/// Cancels the in-flight operation of one session phase
#[derive(Debug, Clone)]
pub struct TransportHandle {
    abort: AbortHandle,
}

impl TransportHandle {
    pub fn new() -> (Self, AbortRegistration) {
        let (abort, registration) = AbortHandle::new_pair();
        (Self { abort }, registration)
    }

    /// Advisory: the request may already be past the point of no return
    pub fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }
}
