//! Listener and server lifecycle.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    task::{JoinError, JoinSet},
    time,
};
use tracing::{debug, info, warn};

use crate::{
    broadcast::Broadcaster,
    connection::run_session,
    directory::Directory,
    dispatch::Dispatcher,
    registry::SessionRegistry,
    session::outbox,
    shutdown::disconnect_all,
};

/// Idle read timeout applied when nothing else is configured.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1000);

/// How long shutdown waits for workers to flush and clean up.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// A session with no input for this long is disconnected.
    pub read_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

pub(crate) struct ServerState {
    pub(crate) directory: Arc<Directory>,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) config: ServerConfig,
}

impl ServerState {
    fn new(config: ServerConfig) -> Self {
        let directory = Arc::new(Directory::new());
        let registry = Arc::new(SessionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&directory), broadcaster),
            directory,
            registry,
            config,
        }
    }
}

impl Server {
    pub fn new(listener: TcpListener, config: ServerConfig) -> Self {
        Self {
            listener,
            state: Arc::new(ServerState::new(config)),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` resolves, then notifies and
    /// disconnects every session and closes the listening socket.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, state } = self;
        let mut workers = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => break,
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &state, &mut workers).await;
                }
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    log_worker_exit(joined);
                }
            }
        }

        info!("relay shutting down");
        disconnect_all(&state.registry).await;
        drop(listener);

        let grace = state.config.shutdown_grace;
        if time::timeout(grace, drain_workers(&mut workers)).await.is_err() {
            warn!(
                remaining = workers.len(),
                "sessions did not close within the grace period, aborting them"
            );
            workers.shutdown().await;
        }
        info!("relay stopped");

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

async fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    state: &Arc<ServerState>,
    workers: &mut JoinSet<()>,
) {
    match result {
        Ok((stream, peer)) => spawn_session(stream, peer, state, workers).await,
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

async fn spawn_session(
    stream: TcpStream,
    peer: SocketAddr,
    state: &Arc<ServerState>,
    workers: &mut JoinSet<()>,
) {
    let (tx, rx) = outbox();
    // Registered before the worker starts so shutdown can always reach it.
    let id = state.registry.register(tx.clone()).await;
    info!(%peer, session = %id, "accepted connection");

    let state = Arc::clone(state);
    workers.spawn(run_session(stream, peer, id, tx, rx, state));
}

async fn drain_workers(workers: &mut JoinSet<()>) {
    while let Some(joined) = workers.join_next().await {
        log_worker_exit(joined);
    }
}

fn log_worker_exit(joined: Result<(), JoinError>) {
    match joined {
        Ok(()) => debug!("session worker finished"),
        Err(err) if err.is_cancelled() => debug!("session worker cancelled"),
        Err(err) => warn!(error = ?err, "session worker panicked"),
    }
}
