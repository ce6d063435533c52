//! Shared helpers for the integration tests: a scripted transport standing in
//! for the signing server and storage, and a recorder for callbacks.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use s3_upload::transport::ProgressSink;
use s3_upload::{
    AuthorizationResult, Method, ProgressEvent, ProgressStatus, Transport, TransportCapabilities,
    TransportError, TransportRequest, TransportResponse, UploadCallbacks,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// How the fake answers one request
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Fail,
    /// Never answers until the request is dropped
    Hang,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Status(200, body.into())
    }

    pub fn status(status: u16) -> Self {
        Reply::Status(status, String::new())
    }
}

type Script = Arc<dyn Fn(&TransportRequest) -> Reply + Send + Sync>;

/// Transport that answers GETs as the signing server and POSTs as storage
pub struct FakeTransport {
    sign: Script,
    upload: Script,
    progress: Vec<ProgressEvent>,
    requests: Mutex<Vec<TransportRequest>>,
    gate: Option<Arc<Semaphore>>,
    in_flight: Arc<AtomicUsize>,
    peak: AtomicUsize,
}

/// Counts a request as in flight until it answers or is dropped
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            sign: Arc::new(|request| Reply::ok(signed_body(&object_name(request)))),
            upload: Arc::new(|_| Reply::ok("")),
            progress: Vec::new(),
            requests: Mutex::new(Vec::new()),
            gate: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: AtomicUsize::new(0),
        }
    }

    /// Hold every request until the gate has permits
    pub fn gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Most requests ever in flight at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn sign_with<F>(mut self, script: F) -> Self
    where
        F: Fn(&TransportRequest) -> Reply + Send + Sync + 'static,
    {
        self.sign = Arc::new(script);
        self
    }

    pub fn upload_with<F>(mut self, script: F) -> Self
    where
        F: Fn(&TransportRequest) -> Reply + Send + Sync + 'static,
    {
        self.upload = Arc::new(script);
        self
    }

    /// Progress events reported for every POST before it answers
    pub fn progress(mut self, events: Vec<ProgressEvent>) -> Self {
        self.progress = events;
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, method: Method) -> Vec<TransportRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        request: TransportRequest,
        progress: Option<ProgressSink>,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(self.in_flight.clone());

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }

        let reply = match request.method {
            Method::Get => (self.sign)(&request),
            Method::Post => {
                if let Some(sink) = progress {
                    for event in &self.progress {
                        sink(*event);
                    }
                }
                (self.upload)(&request)
            }
        };

        match reply {
            Reply::Status(status, body) => Ok(TransportResponse::new(status, body)),
            Reply::Fail => Err(TransportError::Request("connection reset".to_string())),
            Reply::Hang => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Capabilities handing out the same fake transport
pub struct FakeCapabilities {
    pub credentialed: Option<Arc<FakeTransport>>,
    pub legacy: Option<Arc<FakeTransport>>,
}

impl FakeCapabilities {
    pub fn credentialed(transport: Arc<FakeTransport>) -> Arc<Self> {
        Arc::new(Self {
            credentialed: Some(transport),
            legacy: None,
        })
    }

    pub fn none() -> Arc<Self> {
        Arc::new(Self {
            credentialed: None,
            legacy: None,
        })
    }
}

impl TransportCapabilities for FakeCapabilities {
    fn credentialed(&self, _method: Method, _url: &str) -> Option<Arc<dyn Transport>> {
        self.credentialed
            .clone()
            .map(|t| t as Arc<dyn Transport>)
    }

    fn legacy(&self, _method: Method, _url: &str) -> Option<Arc<dyn Transport>> {
        self.legacy.clone().map(|t| t as Arc<dyn Transport>)
    }
}

/// Capabilities that only offer a transport for signing requests
pub struct SigningOnly(pub Arc<FakeTransport>);

impl TransportCapabilities for SigningOnly {
    fn credentialed(&self, method: Method, _url: &str) -> Option<Arc<dyn Transport>> {
        match method {
            Method::Get => Some(self.0.clone() as Arc<dyn Transport>),
            Method::Post => None,
        }
    }
}

pub fn object_name(request: &TransportRequest) -> String {
    url::Url::parse(&request.url)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "objectName")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default()
}

pub fn authorization_for(name: &str) -> AuthorizationResult {
    AuthorizationResult {
        signed_url: "https://bucket.example.com/".to_string(),
        key: format!("uploads/{}", name),
        access_key: "AKIAEXAMPLE".to_string(),
        policy: "cG9saWN5".to_string(),
        signature: "c2lnbmF0dXJl".to_string(),
        public_url: Some(format!("https://cdn.example.com/uploads/{}", name)),
        extra: Default::default(),
    }
}

pub fn signed_body(name: &str) -> String {
    serde_json::to_string(&authorization_for(name)).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress(u8, ProgressStatus),
    Error(String),
    Finished(AuthorizationResult),
}

/// Records every callback in the order it fired
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callbacks(&self) -> UploadCallbacks {
        let progress = self.events.clone();
        let error = self.events.clone();
        let finish = self.events.clone();
        UploadCallbacks::new()
            .on_progress(move |percent, status| {
                progress.lock().push(Event::Progress(percent, status))
            })
            .on_error(move |e| error.lock().push(Event::Error(e.to_string())))
            .on_finish(move |result| finish.lock().push(Event::Finished(result.clone())))
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<AuthorizationResult> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Finished(result) => Some(result),
                _ => None,
            })
            .collect()
    }
}

/// Wait until `condition` holds, polling briefly
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
