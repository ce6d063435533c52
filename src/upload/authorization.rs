//! Signing requests
//!
//! Before a file can go to storage the signing server has to authorize it.
//! One GET per file, no retries.

use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::transport::{CorsTransportFactory, Method, TransportRequest};
use crate::upload::types::{AuthorizationResult, FileDescriptor};
use url::Url;

/// Requests a signed upload authorization for one file
#[derive(Debug, Clone)]
pub struct AuthorizationClient {
    factory: CorsTransportFactory,
    signing_url: std::result::Result<Url, String>,
    query_params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

impl AuthorizationClient {
    pub fn new(factory: CorsTransportFactory, config: &UploadConfig) -> Self {
        Self {
            factory,
            signing_url: config.resolve_signing_url().map_err(|e| e.to_string()),
            query_params: config.signing_url_query_params.clone(),
            headers: config.signing_url_headers.clone(),
        }
    }

    /// The signing URL for a file: `objectName` and `contentType` first, then
    /// the configured query parameters in order.
    pub fn signing_request_url(&self, file: &FileDescriptor) -> Result<Url> {
        let mut url = self
            .signing_url
            .clone()
            .map_err(UploadError::config_error)?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("objectName", &file.sanitized_name());
            query.append_pair("contentType", &file.content_type);
            for (key, value) in &self.query_params {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Ask the signing server to authorize `file`.
    ///
    /// # Errors
    ///
    /// - `CorsNotSupported` if no transport is usable
    /// - `SigningTransport` for a non-200 answer, or status 0 when the request
    ///   never got an answer
    /// - `SigningProtocol` for a 200 answer whose body is not an authorization
    pub async fn request_authorization(
        &self,
        file: &FileDescriptor,
    ) -> Result<AuthorizationResult> {
        let url = self.signing_request_url(file)?;

        let transport = self
            .factory
            .create(Method::Get, url.as_str())
            .ok_or(UploadError::CorsNotSupported)?;

        let request =
            TransportRequest::new(Method::Get, url.as_str()).headers(self.headers.iter().cloned());

        let response = match transport.send(request, None).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("signing request for {} failed: {}", file.name, e);
                return Err(UploadError::signing_transport(0));
            }
        };

        if response.status != 200 {
            return Err(UploadError::signing_transport(response.status));
        }

        serde_json::from_str(&response.body)
            .map_err(|_| UploadError::signing_protocol(response.body))
    }
}
