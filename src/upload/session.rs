//! Per-file upload sessions
//!
//! A session drives one file through authorization and transfer:
//!
//! ```text
//! Pending --start--> Authorizing --ok--> Transferring --ok--> Done
//!                         |                    |
//!                         +------ error -------+--> Failed
//! any non-terminal state --abort()--> Aborted
//! ```
//!
//! Every failure is terminal for the file; nothing is retried. A session owns
//! the handle of whatever request is in flight and replaces it when moving
//! from authorization to transfer.

use crate::callback::{ProgressCallback, ProgressStatus, UploadCallbacks};
use crate::error::UploadError;
use crate::transport::TransportHandle;
use crate::upload::authorization::AuthorizationClient;
use crate::upload::transfer::StorageTransferClient;
use crate::upload::types::{AuthorizationResult, FileDescriptor, SessionState};
use futures::future::Abortable;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

pub struct UploadSession {
    id: usize,
    file: FileDescriptor,
    state: Mutex<SessionState>,
    handle: Mutex<Option<TransportHandle>>,
    callbacks: UploadCallbacks,
    authorizer: Arc<AuthorizationClient>,
    transfer: Arc<StorageTransferClient>,
}

impl UploadSession {
    pub fn new(
        id: usize,
        file: FileDescriptor,
        callbacks: UploadCallbacks,
        authorizer: Arc<AuthorizationClient>,
        transfer: Arc<StorageTransferClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            file,
            state: Mutex::new(SessionState::Pending),
            handle: Mutex::new(None),
            callbacks,
            authorizer,
            transfer,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn file(&self) -> &FileDescriptor {
        &self.file
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Whether a request of this session is currently in flight
    pub fn has_transport_handle(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Drive the session to a terminal state and return it.
    ///
    /// Calling this on a session that already left `Pending` does nothing.
    pub async fn run(self: Arc<Self>) -> SessionState {
        if !self.advance(SessionState::Pending, SessionState::Authorizing) {
            return self.state();
        }
        log::debug!("session {} ({}): authorizing", self.id, self.file.name);

        let registration = self.install_handle();
        let outcome = Abortable::new(
            self.authorizer.request_authorization(&self.file),
            registration,
        )
        .await;

        let authorization = match outcome {
            Err(_aborted) => return self.state(),
            Ok(Err(e)) => {
                self.fail(e);
                return self.state();
            }
            Ok(Ok(authorization)) => authorization,
        };

        if !self.advance(SessionState::Authorizing, SessionState::Transferring) {
            return self.state();
        }
        log::debug!(
            "session {} ({}): transferring to {}",
            self.id,
            self.file.name,
            authorization.signed_url
        );

        let registration = self.install_handle();
        let outcome = Abortable::new(
            self.transfer
                .transfer(&self.file, &authorization, self.progress_callback()),
            registration,
        )
        .await;

        match outcome {
            Err(_aborted) => {}
            Ok(Err(e)) => self.fail(e),
            Ok(Ok(())) => self.finish(&authorization),
        }

        self.state()
    }

    /// Abort the session.
    ///
    /// The in-flight request, if any, is asked to stop and the session moves
    /// to `Aborted` right away; no callback fires after this returns. A
    /// session that already finished is left alone.
    pub fn abort(&self) {
        {
            let mut state = self.state.lock();
            if state.is_terminal() {
                return;
            }
            *state = SessionState::Aborted;
        }

        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }

        log::info!("session {} ({}): aborted", self.id, self.file.name);
    }

    fn advance(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.state.lock();
        if *state != from {
            return false;
        }
        *state = to;
        true
    }

    /// Move to a terminal state unless the session already got there
    fn settle(&self, to: SessionState) -> bool {
        let settled = {
            let mut state = self.state.lock();
            if state.is_terminal() {
                false
            } else {
                *state = to;
                true
            }
        };

        if settled {
            self.handle.lock().take();
        }
        settled
    }

    fn install_handle(&self) -> futures::future::AbortRegistration {
        let (handle, registration) = TransportHandle::new();
        let mut slot = self.handle.lock();
        // abort() may have run between the state change and now
        if self.state().is_terminal() {
            handle.abort();
        }
        *slot = Some(handle);
        registration
    }

    fn fail(&self, error: UploadError) {
        if self.settle(SessionState::Failed) {
            log::warn!("session {} ({}): {}", self.id, self.file.name, error);
            self.callbacks.error(&error);
        }
    }

    fn finish(&self, authorization: &AuthorizationResult) {
        if self.settle(SessionState::Done) {
            log::info!(
                "session {} ({}): uploaded as {}",
                self.id,
                self.file.name,
                authorization.key
            );
            self.callbacks.finish(authorization);
        }
    }

    /// Progress forwarder that goes quiet once the session is terminal
    fn progress_callback(self: &Arc<Self>) -> ProgressCallback {
        let session = Arc::downgrade(self);
        Arc::new(move |percent: u8, status: ProgressStatus| {
            if let Some(session) = session.upgrade() {
                if !session.state().is_terminal() {
                    session.callbacks.progress(percent, status);
                }
            }
        })
    }
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("id", &self.id)
            .field("file", &self.file)
            .field("state", &self.state())
            .field("in_flight", &self.has_transport_handle())
            .finish()
    }
}
