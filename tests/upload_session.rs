//! State machine and cancellation of single upload sessions

mod common;

use common::{eventually, Event, FakeCapabilities, FakeTransport, Recorder, Reply};
use s3_upload::{
    AuthorizationClient, CorsTransportFactory, FileDescriptor, Method, SessionState,
    StorageTransferClient, UploadConfig, UploadSession,
};
use std::sync::Arc;

fn session(transport: Arc<FakeTransport>, recorder: &Recorder) -> Arc<UploadSession> {
    let config = UploadConfig::new().base_url("https://app.example.com");
    let factory = CorsTransportFactory::new(FakeCapabilities::credentialed(transport));

    UploadSession::new(
        0,
        FileDescriptor::new("report.pdf", "application/pdf", "%PDF-1.7"),
        recorder.callbacks(),
        Arc::new(AuthorizationClient::new(factory.clone(), &config)),
        Arc::new(StorageTransferClient::new(factory, &config)),
    )
}

#[tokio::test]
async fn test_session_runs_to_done() {
    let recorder = Recorder::new();
    let session = session(Arc::new(FakeTransport::new()), &recorder);
    assert_eq!(session.state(), SessionState::Pending);

    let state = session.clone().run().await;

    assert_eq!(state, SessionState::Done);
    assert_eq!(session.state(), SessionState::Done);
    assert!(!session.has_transport_handle());
    assert_eq!(recorder.finished().len(), 1);
}

#[tokio::test]
async fn test_abort_without_in_flight_request_is_harmless() {
    let recorder = Recorder::new();
    let transport = Arc::new(FakeTransport::new());
    let session = session(transport.clone(), &recorder);

    assert!(!session.has_transport_handle());
    session.abort();
    assert_eq!(session.state(), SessionState::Aborted);

    // an aborted session never starts
    let state = session.clone().run().await;
    assert_eq!(state, SessionState::Aborted);
    assert!(transport.requests().is_empty());
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_abort_after_completion_is_a_no_op() {
    let recorder = Recorder::new();
    let session = session(Arc::new(FakeTransport::new()), &recorder);

    session.clone().run().await;
    session.abort();
    session.abort();

    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(recorder.finished().len(), 1);
    assert!(recorder.errors().is_empty());
}

#[tokio::test]
async fn test_abort_while_authorizing() {
    let recorder = Recorder::new();
    let transport = Arc::new(FakeTransport::new().sign_with(|_| Reply::Hang));
    let session = session(transport.clone(), &recorder);

    let task = tokio::spawn(session.clone().run());
    eventually(|| transport.requests_for(Method::Get).len() == 1).await;
    assert_eq!(session.state(), SessionState::Authorizing);
    assert!(session.has_transport_handle());

    session.abort();
    assert_eq!(session.state(), SessionState::Aborted);

    let state = task.await.unwrap();
    assert_eq!(state, SessionState::Aborted);
    assert!(transport.requests_for(Method::Post).is_empty());
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_abort_while_transferring() {
    let recorder = Recorder::new();
    let transport = Arc::new(FakeTransport::new().upload_with(|_| Reply::Hang));
    let session = session(transport.clone(), &recorder);

    let task = tokio::spawn(session.clone().run());
    eventually(|| transport.requests_for(Method::Post).len() == 1).await;
    assert_eq!(session.state(), SessionState::Transferring);

    session.abort();

    assert_eq!(task.await.unwrap(), SessionState::Aborted);
    assert!(recorder.finished().is_empty());
    assert!(recorder.errors().is_empty());
    assert!(!session.has_transport_handle());
}

#[tokio::test]
async fn test_failure_is_terminal() {
    let recorder = Recorder::new();
    let transport = Arc::new(FakeTransport::new().upload_with(|_| Reply::status(500)));
    let session = session(transport.clone(), &recorder);

    assert_eq!(session.clone().run().await, SessionState::Failed);

    // running again does not retry
    assert_eq!(session.clone().run().await, SessionState::Failed);
    assert_eq!(transport.requests().len(), 2);
    assert_eq!(recorder.events(), vec![Event::Error("Upload error: 500".to_string())]);
}
