//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect the session store before anything listens
//! - Bind the listener only once the store is ready
//! - Start background tasks (expired-session purge)
//! - Publish progress as a [`StartupState`]
//!
//! # State Machine
//! ```text
//! Disconnected → Connecting ─ok──→ Ready → Listening
//!                    │  ▲
//!                    │  └─ retry (connect_attempts > 1)
//!                    └─err─→ Failed   (listener never bound)
//! ```
//!
//! # Design Decisions
//! - Fail fast: a store that cannot be reached is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::{CorsOrigin, GatewayConfig, StoreConfig};
use crate::http::{build_pipeline, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::metrics;
use crate::resilience::backoff::ConnectRetry;
use crate::resilience::timeouts::with_deadline;
use crate::routing::Collaborators;
use crate::session::{SessionStore, StoreError};

/// Where startup currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupState {
    Disconnected,
    Connecting,
    Ready,
    Listening,
    Failed,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("session store unavailable after {attempts} attempt(s): {source}")]
    Store {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Gateway waiting to be started.
pub struct Gateway {
    config: GatewayConfig,
    collaborators: Collaborators,
    state: watch::Sender<StartupState>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, collaborators: Collaborators) -> Self {
        let (state, _) = watch::channel(StartupState::Disconnected);
        Self { config, collaborators, state }
    }

    /// Observe startup progress.
    pub fn state(&self) -> watch::Receiver<StartupState> {
        self.state.subscribe()
    }

    /// Connect the store, then bind and begin serving.
    pub async fn start(self) -> Result<RunningGateway, StartupError> {
        let Gateway { config, collaborators, state } = self;

        let store = match connect_store(&config.store, &state).await {
            Ok(store) => store,
            Err(e) => {
                state.send_replace(StartupState::Failed);
                tracing::error!(error = %e, "Session store connection failed, not listening");
                return Err(e);
            }
        };
        state.send_replace(StartupState::Ready);

        let address = config.server.bind_address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(source) => {
                store.close().await;
                state.send_replace(StartupState::Failed);
                return Err(StartupError::Bind { address, source });
            }
        };
        let local_addr = listener.local_addr()?;

        let router = build_pipeline(&config, store.clone(), collaborators);
        let shutdown = Shutdown::new();
        let purge = spawn_purge_task(
            store.clone(),
            Duration::from_secs(config.session.purge_interval_secs.max(1)),
            shutdown.subscribe(),
        );
        let server = tokio::spawn(HttpServer::new(router).run(listener, shutdown.subscribe()));

        state.send_replace(StartupState::Listening);
        tracing::info!(
            address = %local_addr,
            production = config.server.production,
            "Server started on http://localhost:{}",
            local_addr.port()
        );
        match config.cors.origin_mode() {
            CorsOrigin::ReflectAll => tracing::info!("CORS: allowing all origins with credentials"),
            CorsOrigin::List(origins) => tracing::info!(
                origins = ?origins,
                "CORS: allowing listed origins with credentials"
            ),
        }

        Ok(RunningGateway { local_addr, store, shutdown, server, purge, state })
    }

    /// Start, serve until SIGINT/SIGTERM, then shut down.
    pub async fn run(self) -> Result<(), StartupError> {
        let mut running = self.start().await?;

        tokio::select! {
            _ = shutdown_signal() => {}
            result = &mut running.server => {
                tracing::warn!("HTTP server exited without a shutdown signal");
                running.shutdown.trigger();
                let _ = (&mut running.purge).await;
                running.store.close().await;
                running.state.send_replace(StartupState::Disconnected);
                return result?.map_err(StartupError::Serve);
            }
        }

        running.shutdown().await
    }
}

/// A gateway that is accepting connections.
pub struct RunningGateway {
    local_addr: SocketAddr,
    store: SessionStore,
    shutdown: Shutdown,
    server: JoinHandle<Result<(), std::io::Error>>,
    purge: JoinHandle<()>,
    state: watch::Sender<StartupState>,
}

impl RunningGateway {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn state(&self) -> watch::Receiver<StartupState> {
        self.state.subscribe()
    }

    /// Stop accepting, drain in-flight requests, stop the purge task and
    /// release the store.
    pub async fn shutdown(self) -> Result<(), StartupError> {
        let tasks = self.shutdown.trigger();
        tracing::info!(tasks, "Shutting down");

        let served = self.server.await;
        if let Err(e) = self.purge.await {
            tracing::warn!(error = %e, "Purge task ended abnormally");
        }
        self.store.close().await;
        self.state.send_replace(StartupState::Disconnected);

        served??;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}

async fn connect_store(
    config: &StoreConfig,
    state: &watch::Sender<StartupState>,
) -> Result<SessionStore, StartupError> {
    let retry = ConnectRetry::from(config);
    let deadline = Duration::from_secs(config.connect_timeout_secs);
    let mut attempt = 0;

    loop {
        attempt += 1;
        state.send_replace(StartupState::Connecting);
        tracing::info!(backend = ?config.backend, attempt, "Connecting to session store");

        let connected = async {
            let store = SessionStore::connect(config).await?;
            store.ping().await?;
            Ok::<_, StoreError>(store)
        };
        let result = match with_deadline(deadline, connected).await {
            Ok(result) => result,
            Err(elapsed) => Err(StoreError::TimedOut(elapsed)),
        };

        match result {
            Ok(store) => {
                tracing::info!(backend = ?store.kind(), "Session store connected");
                return Ok(store);
            }
            Err(source) => {
                let Some(delay) = retry.delay_after(attempt) else {
                    return Err(StartupError::Store { attempts: attempt, source });
                };
                tracing::warn!(
                    error = %source,
                    attempt,
                    remaining = retry.attempts() - attempt,
                    delay = ?delay,
                    "Session store connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn spawn_purge_task(
    store: SessionStore,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => match store.purge_expired().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "Purged expired sessions"),
                    Err(e) => {
                        metrics::record_store_failure("purge");
                        tracing::warn!(error = %e, "Expired session purge failed");
                    }
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    fn config(backend: StoreBackend, url: &str) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.store.backend = backend;
        config.store.url = url.to_string();
        config
    }

    #[tokio::test]
    async fn store_failure_never_binds() {
        let mut config = config(StoreBackend::Durable, "sqlite:///nonexistent-dir/for/sure/s.db");
        config.store.connect_attempts = 2;
        config.store.retry_base_delay_ms = 1;
        config.store.retry_max_delay_ms = 1;

        let gateway = Gateway::new(config, Collaborators::builtin());
        let state = gateway.state();

        let err = gateway.start().await.err().expect("startup must fail");
        assert!(matches!(err, StartupError::Store { attempts: 2, .. }));
        assert_eq!(*state.borrow(), StartupState::Failed);
    }

    #[tokio::test]
    async fn memory_store_reaches_listening_and_shuts_down() {
        let gateway = Gateway::new(config(StoreBackend::Memory, ""), Collaborators::builtin());
        let state = gateway.state();

        let running = gateway.start().await.unwrap();
        assert_eq!(*state.borrow(), StartupState::Listening);
        assert_ne!(running.local_addr().port(), 0);

        let addr = running.local_addr();
        running.shutdown().await.unwrap();
        assert_eq!(*state.borrow(), StartupState::Disconnected);
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn purge_task_removes_expired_sessions_until_shutdown() {
        use crate::session::{MemoryStore, SessionId, SessionRecord};
        use chrono::{Duration as ChronoDuration, Utc};

        let memory = MemoryStore::new();
        let store = SessionStore::memory(memory.clone(), Duration::from_secs(1));
        let now = Utc::now();
        let stale = SessionRecord::new(SessionId::generate(), now - ChronoDuration::hours(2), ChronoDuration::hours(1));
        let live = SessionRecord::new(SessionId::generate(), now, ChronoDuration::hours(1));
        store.save(&stale).await.unwrap();
        store.save(&live).await.unwrap();

        let shutdown = Shutdown::new();
        let purge = spawn_purge_task(store, Duration::from_millis(20), shutdown.subscribe());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while memory.len() > 1 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(memory.len(), 1);

        assert_eq!(shutdown.trigger(), 1);
        tokio::time::timeout(Duration::from_secs(1), purge).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config(StoreBackend::Memory, "");
        config.server.port = taken.local_addr().unwrap().port();

        let err = Gateway::new(config, Collaborators::none()).start().await.err().unwrap();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
