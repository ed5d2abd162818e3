//! Graceful Shutdown Handler
//!
//! Stops the poll ticker, then force-kills every node still recorded in the
//! registry before the process exits. Each phase is bounded by a timeout.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

/// Shutdown signal types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Normal graceful shutdown (SIGTERM, SIGINT, `exit` from the shell)
    Graceful,
    /// Urgent shutdown (SIGQUIT)
    Urgent,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Graceful => write!(f, "graceful"),
            ShutdownSignal::Urgent => write!(f, "urgent"),
        }
    }
}

/// Configuration for graceful shutdown
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Total timeout for the whole sequence (default: 30s)
    pub total_timeout_secs: u64,
    /// Time to wait for the poll loop to exit (default: 5s)
    pub poller_stop_timeout_secs: u64,
    /// Time to wait for node termination (default: 20s)
    pub terminate_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            total_timeout_secs: 30,
            poller_stop_timeout_secs: 5,
            terminate_timeout_secs: 20,
        }
    }
}

/// Shutdown phase tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Not shutting down
    Running,
    /// Waiting for the poll loop to finish its tick and exit
    StoppingPoller,
    /// Killing every node still in the registry
    TerminatingNodes,
    /// Shutdown complete
    Complete,
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownPhase::Running => write!(f, "running"),
            ShutdownPhase::StoppingPoller => write!(f, "stopping_poller"),
            ShutdownPhase::TerminatingNodes => write!(f, "terminating_nodes"),
            ShutdownPhase::Complete => write!(f, "complete"),
        }
    }
}

/// Shutdown errors
#[derive(Debug, Clone, Error)]
pub enum ShutdownError {
    #[error("shutdown timed out")]
    Timeout,
}

/// Graceful shutdown coordinator
pub struct GracefulShutdown {
    config: ShutdownConfig,
    shutdown_requested: AtomicBool,
    phase: watch::Sender<ShutdownPhase>,
    signal_tx: broadcast::Sender<ShutdownSignal>,
}

impl GracefulShutdown {
    pub fn new(config: ShutdownConfig) -> Self {
        let (phase, _) = watch::channel(ShutdownPhase::Running);
        let (signal_tx, _) = broadcast::channel(8);

        Self {
            config,
            shutdown_requested: AtomicBool::new(false),
            phase,
            signal_tx,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ShutdownConfig::default())
    }

    /// Subscribe to shutdown signals
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.signal_tx.subscribe()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn current_phase(&self) -> ShutdownPhase {
        *self.phase.borrow()
    }

    /// Request shutdown with specified signal type. Only the first request
    /// is broadcast.
    pub fn request_shutdown(&self, signal: ShutdownSignal) {
        if self.shutdown_requested.swap(true, Ordering::SeqCst) {
            warn!(%signal, "shutdown already requested, ignoring duplicate signal");
            return;
        }

        info!(%signal, "shutdown requested");
        let _ = self.signal_tx.send(signal);
    }

    /// Wait until shutdown has been requested
    pub async fn wait_for_request(&self) -> ShutdownSignal {
        let mut rx = self.subscribe();
        if self.is_shutdown_requested() {
            return ShutdownSignal::Graceful;
        }
        rx.recv().await.unwrap_or(ShutdownSignal::Urgent)
    }

    fn set_phase(&self, phase: ShutdownPhase) {
        self.phase.send_replace(phase);
        info!(%phase, "shutdown phase");
    }

    /// Run the shutdown sequence:
    /// 1. wait for the poll loop to stop
    /// 2. terminate every recorded node, which reports how many were killed
    pub async fn execute<F1, Fut1, F2, Fut2>(
        &self,
        stop_poller: F1,
        terminate_nodes: F2,
    ) -> Result<(), ShutdownError>
    where
        F1: FnOnce() -> Fut1,
        Fut1: Future<Output = ()>,
        F2: FnOnce() -> Fut2,
        Fut2: Future<Output = usize>,
    {
        let start = std::time::Instant::now();
        let total_timeout = Duration::from_secs(self.config.total_timeout_secs);
        info!(timeout_secs = self.config.total_timeout_secs, "starting graceful shutdown");

        self.set_phase(ShutdownPhase::StoppingPoller);
        let poller_timeout = Duration::from_secs(self.config.poller_stop_timeout_secs);
        match tokio::time::timeout(poller_timeout, stop_poller()).await {
            Ok(()) => debug!("poll loop stopped"),
            Err(_) => warn!(
                timeout_secs = self.config.poller_stop_timeout_secs,
                "poll loop did not stop in time, proceeding anyway"
            ),
        }

        if start.elapsed() > total_timeout {
            error!("total shutdown timeout exceeded");
            self.set_phase(ShutdownPhase::Complete);
            return Err(ShutdownError::Timeout);
        }

        self.set_phase(ShutdownPhase::TerminatingNodes);
        let terminate_timeout = Duration::from_secs(self.config.terminate_timeout_secs);
        let outcome = tokio::time::timeout(terminate_timeout, terminate_nodes()).await;

        self.set_phase(ShutdownPhase::Complete);
        match outcome {
            Ok(killed) => {
                info!(killed, elapsed = ?start.elapsed(), "graceful shutdown completed");
                Ok(())
            }
            Err(_) => {
                error!(
                    timeout_secs = self.config.terminate_timeout_secs,
                    "node termination timed out"
                );
                Err(ShutdownError::Timeout)
            }
        }
    }
}

/// Spawn OS signal listeners that request shutdown
pub fn install_signal_handlers(shutdown: Arc<GracefulShutdown>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let handlers = [
            (SignalKind::terminate(), "SIGTERM", ShutdownSignal::Graceful),
            (SignalKind::interrupt(), "SIGINT", ShutdownSignal::Graceful),
            (SignalKind::quit(), "SIGQUIT", ShutdownSignal::Urgent),
        ];

        for (kind, name, request) in handlers {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let mut stream = match signal(kind) {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!(signal = name, error = %e, "failed to install signal handler");
                        return;
                    }
                };
                stream.recv().await;
                info!(signal = name, "received signal");
                shutdown.request_shutdown(request);
            });
        }
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received Ctrl+C");
                    shutdown.request_shutdown(ShutdownSignal::Graceful);
                }
                Err(e) => error!(error = %e, "failed to install Ctrl+C handler"),
            }
        });
    }
}
