//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::path::Path;

use chat_gateway::config::{GatewayConfig, StoreBackend};
use chat_gateway::lifecycle::{Gateway, RunningGateway};
use chat_gateway::routing::Collaborators;
use tempfile::TempDir;

/// A gateway listening on an ephemeral port with its own temp directory.
pub struct TestGateway {
    pub running: RunningGateway,
    pub base: String,
    pub client: reqwest::Client,
    pub dir: TempDir,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn stop(self) -> TempDir {
        self.running.shutdown().await.unwrap();
        self.dir
    }
}

/// Config pointing at a SQLite file and public dir inside `dir`.
pub fn test_config(dir: &Path) -> GatewayConfig {
    let public = dir.join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("style.css"), "body { color: teal; }").unwrap();

    let mut config = GatewayConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.public_dir = public.display().to_string();
    config.store.backend = StoreBackend::Durable;
    config.store.url = database_url(dir);
    config
}

/// Start a gateway with the built-in collaborators.
pub async fn start_gateway<F>(configure: F) -> TestGateway
where
    F: FnOnce(&mut GatewayConfig),
{
    start_in(tempfile::tempdir().unwrap(), configure).await
}

/// Start a gateway reusing an existing temp directory (and its database).
pub async fn start_in<F>(dir: TempDir, configure: F) -> TestGateway
where
    F: FnOnce(&mut GatewayConfig),
{
    start_with(dir, Collaborators::builtin(), configure).await
}

/// Start a gateway with extra collaborators mounted.
pub async fn start_with<F>(dir: TempDir, collaborators: Collaborators, configure: F) -> TestGateway
where
    F: FnOnce(&mut GatewayConfig),
{
    let mut config = test_config(dir.path());
    configure(&mut config);

    let running = Gateway::new(config, collaborators)
        .start()
        .await
        .expect("gateway should start");
    let base = format!("http://{}", running.local_addr());

    TestGateway {
        running,
        base,
        client: reqwest::Client::new(),
        dir,
    }
}

/// URL of the SQLite database `test_config` points at.
pub fn database_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join("sessions.db").display())
}

/// The `name=value` pair from a response's `Set-Cookie`, if any.
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    let raw = response.headers().get(reqwest::header::SET_COOKIE)?.to_str().ok()?;
    raw.split(';').next().map(str::to_string)
}
