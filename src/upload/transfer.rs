//! Storage POST
//!
//! Sends a file straight to the storage endpoint named by an authorization,
//! as a pre-signed multipart form. The form always carries `acl=private`
//! while the default request header asks for `public-read`; both are sent
//! as configured and the storage backend decides.

use crate::callback::{ProgressCallback, ProgressStatus};
use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::transport::{
    CorsTransportFactory, FormFile, Method, MultipartForm, ProgressEvent, ProgressSink,
    TransportRequest,
};
use crate::upload::types::{AuthorizationResult, FileDescriptor};
use std::sync::Arc;

/// Value of the `acl` form field
pub const FORM_ACL: &str = "private";

/// Value of the `success_action_status` form field
pub const SUCCESS_ACTION_STATUS: u16 = 200;

/// Uploads files to storage using signing server authorizations
#[derive(Debug, Clone)]
pub struct StorageTransferClient {
    factory: CorsTransportFactory,
    headers: Vec<(String, String)>,
}

impl StorageTransferClient {
    pub fn new(factory: CorsTransportFactory, config: &UploadConfig) -> Self {
        Self {
            factory,
            headers: config.effective_upload_headers(),
        }
    }

    /// Headers sent with every storage POST
    pub fn request_headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The multipart form for `file`, fields in the order storage expects
    pub fn build_form(file: &FileDescriptor, authorization: &AuthorizationResult) -> MultipartForm {
        let file_name = file.sanitized_name();

        MultipartForm::new()
            .text("key", authorization.key.as_str())
            .text("acl", FORM_ACL)
            .text("AWSAccessKeyId", authorization.access_key.as_str())
            .text("success_action_status", SUCCESS_ACTION_STATUS.to_string())
            .text("Policy", authorization.policy.as_str())
            .text("Signature", authorization.signature.as_str())
            .file(
                "file",
                FormFile {
                    file_name,
                    content_type: file.content_type.clone(),
                    content: file.content.clone(),
                },
            )
    }

    /// POST `file` to `authorization.signed_url`.
    ///
    /// Progress with a known total is reported as a rounded percentage;
    /// events without a total are dropped. On a 200 answer
    /// `(100, Completed)` is reported before returning.
    pub async fn transfer(
        &self,
        file: &FileDescriptor,
        authorization: &AuthorizationResult,
        on_progress: ProgressCallback,
    ) -> Result<()> {
        let transport = self
            .factory
            .create(Method::Post, &authorization.signed_url)
            .ok_or(UploadError::CorsNotSupported)?;

        let request = TransportRequest::new(Method::Post, authorization.signed_url.as_str())
            .headers(self.headers.iter().cloned())
            .form(Self::build_form(file, authorization));

        let forward = on_progress.clone();
        let sink: ProgressSink = Arc::new(move |event: ProgressEvent| {
            if let Some(percent) = event.percent() {
                forward(percent, ProgressStatus::for_percent(percent));
            }
        });

        let response = transport
            .send(request, Some(sink))
            .await
            .map_err(|e| UploadError::upload_transport(e.to_string()))?;

        if response.status != 200 {
            return Err(UploadError::upload_status(response.status));
        }

        on_progress(100, ProgressStatus::Completed);
        Ok(())
    }
}
