pub mod callback;
pub mod config;
pub mod error;
pub mod transport;
pub mod upload;

pub use callback::{ProgressStatus, UploadCallbacks};

pub use config::{UploadConfig, DEFAULT_SIGNING_URL};

pub use error::{Result, UploadError};

pub use transport::{
    CorsTransportFactory, HttpCapabilities, HttpTransport, Method, MultipartForm, ProgressEvent,
    Transport, TransportCapabilities, TransportError, TransportHandle, TransportRequest,
    TransportResponse,
};

pub use upload::{
    sanitize_name, AuthorizationClient, AuthorizationResult, FileDescriptor, FileList,
    SessionState, StorageTransferClient, UploadCoordinator, UploadSession,
};
