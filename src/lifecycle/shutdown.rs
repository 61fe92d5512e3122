//! Shutdown trigger for the gateway's long-running tasks.
//!
//! # Subscribers
//! - The HTTP server: stops accepting, then drains in-flight requests
//! - The expired-session purge task: exits between ticks
//!
//! Both subscribe before startup reports `Listening`, so a trigger fired by
//! `RunningGateway::shutdown` always reaches them.

use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal, returning how many tasks were still listening.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
