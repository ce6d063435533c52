//! Direct-to-storage uploads
//!
//! This module sequences the two network operations of every file: asking the
//! signing server for an authorization, then posting the file to storage with
//! it. Outcomes are reported through callbacks.

pub mod authorization;
pub mod coordinator;
pub mod session;
pub mod transfer;
pub mod types;

pub use authorization::AuthorizationClient;
pub use coordinator::UploadCoordinator;
pub use session::UploadSession;
pub use transfer::StorageTransferClient;
pub use types::{sanitize_name, AuthorizationResult, FileDescriptor, FileList, SessionState};
