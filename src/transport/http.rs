//! Native transport on top of `reqwest`

use crate::error::Result;
use crate::transport::progress::{ProgressStream, DEFAULT_CHUNK_SIZE};
use crate::transport::{
    Method, MultipartForm, ProgressSink, RequestBody, Transport, TransportCapabilities,
    TransportError, TransportRequest, TransportResponse,
};
use async_trait::async_trait;
use mime_guess::mime::{Mime, APPLICATION_OCTET_STREAM};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::sync::Arc;

/// Executes requests with a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Size of the slices the file part is streamed in
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    fn build_form(
        &self,
        form: MultipartForm,
        progress: Option<ProgressSink>,
    ) -> std::result::Result<Form, TransportError> {
        let (fields, file) = form.into_parts();

        let mut multipart = Form::new();
        for (name, value) in fields {
            multipart = multipart.text(name, value);
        }

        if let Some((name, file)) = file {
            let content_type = match file.content_type.parse::<Mime>() {
                Ok(_) => file.content_type,
                Err(_) => {
                    log::debug!(
                        "unusable content type '{}' for {}, sending {}",
                        file.content_type,
                        file.file_name,
                        APPLICATION_OCTET_STREAM
                    );
                    APPLICATION_OCTET_STREAM.to_string()
                }
            };

            let length = file.content.len() as u64;
            let stream = ProgressStream::new(file.content, self.chunk_size, progress);
            let part = Part::stream_with_length(Body::wrap_stream(stream), length)
                .file_name(file.file_name)
                .mime_str(&content_type)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            multipart = multipart.part(name, part);
        }

        Ok(multipart)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: TransportRequest,
        progress: Option<ProgressSink>,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        log::debug!("{} {}", request.method, request.url);

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(form) => builder.multipart(self.build_form(form, progress)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        // the storage answer body is never inspected, only the signing one
        let body = match request.method {
            Method::Get => response
                .text()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?,
            Method::Post => response.text().await.unwrap_or_else(|e| {
                log::debug!("ignoring unreadable body of {}: {}", request.url, e);
                String::new()
            }),
        };

        log::debug!("{} {} -> {}", request.method, request.url, status);

        Ok(TransportResponse { status, body })
    }
}

/// Capabilities of a native target: a full HTTP client, no legacy fallback
#[derive(Debug, Clone)]
pub struct HttpCapabilities {
    transport: Arc<HttpTransport>,
}

impl HttpCapabilities {
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self::with_transport(HttpTransport::new(client))
    }

    pub fn with_transport(transport: HttpTransport) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }
}

impl TransportCapabilities for HttpCapabilities {
    fn credentialed(&self, _method: Method, _url: &str) -> Option<Arc<dyn Transport>> {
        let transport: Arc<dyn Transport> = self.transport.clone();
        Some(transport)
    }
}
