//! Batch entry point
//!
//! The coordinator snapshots the file source, reports `(0, Waiting)` once,
//! and starts one session per file. Sessions run independently: there is no
//! ordering between files and no aggregate failure. Concurrency is unbounded
//! unless `max_concurrent_uploads` is set.

use crate::callback::ProgressStatus;
use crate::config::UploadConfig;
use crate::error::Result;
use crate::transport::{CorsTransportFactory, HttpCapabilities, TransportCapabilities};
use crate::upload::authorization::AuthorizationClient;
use crate::upload::session::UploadSession;
use crate::upload::transfer::StorageTransferClient;
use crate::upload::types::SessionState;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub struct UploadCoordinator {
    sessions: Vec<Arc<UploadSession>>,
    tasks: Vec<JoinHandle<SessionState>>,
}

impl UploadCoordinator {
    /// Start uploading with the native HTTP transport.
    ///
    /// Must be called from within a tokio runtime. Returns as soon as every
    /// session has been spawned.
    pub fn start(config: UploadConfig) -> Result<Self> {
        let capabilities = HttpCapabilities::new()?;
        Ok(Self::start_with(config, Arc::new(capabilities)))
    }

    /// Start uploading with the given transport capabilities
    pub fn start_with(config: UploadConfig, capabilities: Arc<dyn TransportCapabilities>) -> Self {
        let files = config.resolve_files();
        let callbacks = config.callbacks.clone();

        callbacks.progress(0, ProgressStatus::Waiting);

        let factory = CorsTransportFactory::new(capabilities);
        let authorizer = Arc::new(AuthorizationClient::new(factory.clone(), &config));
        let transfer = Arc::new(StorageTransferClient::new(factory, &config));
        let limit = config
            .max_concurrent_uploads
            .map(|max| Arc::new(Semaphore::new(max.max(1))));

        log::info!(
            "starting {} upload session(s){}",
            files.len(),
            match config.max_concurrent_uploads {
                Some(max) => format!(", at most {} at once", max),
                None => String::new(),
            }
        );

        let sessions: Vec<Arc<UploadSession>> = files
            .into_iter()
            .enumerate()
            .map(|(id, file)| {
                UploadSession::new(
                    id,
                    file,
                    callbacks.clone(),
                    authorizer.clone(),
                    transfer.clone(),
                )
            })
            .collect();

        let tasks = sessions
            .iter()
            .map(|session| {
                let session = session.clone();
                let limit = limit.clone();
                tokio::spawn(async move {
                    let _permit = match limit {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    session.run().await
                })
            })
            .collect();

        Self { sessions, tasks }
    }

    /// One session per file, in file-source order
    pub fn sessions(&self) -> &[Arc<UploadSession>] {
        &self.sessions
    }

    pub fn session(&self, id: usize) -> Option<&Arc<UploadSession>> {
        self.sessions.get(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Abort every session that has not finished yet
    pub fn abort_all(&self) {
        for session in &self.sessions {
            session.abort();
        }
    }

    /// Wait for every session and return their final states in order
    pub async fn wait(self) -> Vec<SessionState> {
        let mut states = Vec::with_capacity(self.tasks.len());

        for (session, task) in self.sessions.iter().zip(self.tasks) {
            let state = match task.await {
                Ok(state) => state,
                Err(e) => {
                    log::error!("session {} task ended abnormally: {}", session.id(), e);
                    session.state()
                }
            };
            states.push(state);
        }

        states
    }
}

impl std::fmt::Debug for UploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCoordinator")
            .field("sessions", &self.sessions)
            .finish()
    }
}
