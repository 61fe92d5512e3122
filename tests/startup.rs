//! Startup ordering: nothing listens until the session store is connected.

use std::time::Duration;

use chat_gateway::config::StoreBackend;
use chat_gateway::lifecycle::{Gateway, StartupError, StartupState};
use chat_gateway::routing::Collaborators;
use tokio::net::{TcpListener, TcpStream};

mod common;

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn unreachable_store_leaves_port_closed() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port().await;

    let mut config = common::test_config(dir.path());
    config.server.port = port;
    config.store.url = "sqlite:///nonexistent-dir/for/sure/sessions.db".to_string();

    let gateway = Gateway::new(config, Collaborators::builtin());
    let state = gateway.state();
    let err = gateway.start().await.err().expect("startup must fail");

    assert!(matches!(err, StartupError::Store { attempts: 1, .. }));
    assert_eq!(*state.borrow(), StartupState::Failed);
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
}

#[tokio::test]
async fn connect_deadline_applies_to_each_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(dir.path());
    config.store.url = "sqlite:///nonexistent-dir/for/sure/sessions.db".to_string();
    config.store.connect_attempts = 3;
    config.store.retry_base_delay_ms = 10;
    config.store.retry_max_delay_ms = 20;

    let started = std::time::Instant::now();
    let err = Gateway::new(config, Collaborators::builtin()).start().await.err().unwrap();
    assert!(matches!(err, StartupError::Store { attempts: 3, .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn healthy_store_reaches_listening() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(dir.path());
    config.store.backend = StoreBackend::Memory;

    let gateway = Gateway::new(config, Collaborators::builtin());
    let mut state = gateway.state();
    assert_eq!(*state.borrow_and_update(), StartupState::Disconnected);

    let running = gateway.start().await.unwrap();
    assert_eq!(*state.borrow(), StartupState::Listening);

    let addr = running.local_addr();
    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    running.shutdown().await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}
