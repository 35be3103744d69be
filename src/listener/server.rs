//! Inbound listener - axum router and lifecycle

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::common::{Error, Result};
use crate::display::DisplaySink;
use crate::xmlrpc::{service, MethodResponse};

use super::handler;

/// Lifecycle of the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Stopped,
    Running,
}

struct Running {
    addr: SocketAddr,
    shutdown: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

/// XML-RPC server the platform calls into
pub struct Listener {
    port: u16,
    sink: DisplaySink,
    state: Arc<watch::Sender<ListenerState>>,
    running: Option<Running>,
}

impl Listener {
    /// Create a stopped listener for `127.0.0.1:{port}`
    ///
    /// Port 0 picks an ephemeral port; see [`Listener::local_addr`].
    pub fn new(port: u16, sink: DisplaySink) -> Self {
        let (state, _) = watch::channel(ListenerState::Stopped);
        Self {
            port,
            sink,
            state: Arc::new(state),
            running: None,
        }
    }

    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Bound address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match (&self.running, self.state()) {
            (Some(running), ListenerState::Running) => Some(running.addr),
            _ => None,
        }
    }

    /// Bind the port and start accepting calls
    ///
    /// Starting a running listener is a no-op that returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr() {
            tracing::warn!(%addr, "Listener already running");
            return Ok(addr);
        }

        // Reap a server that ended on its own (closeApplication)
        if let Some(previous) = self.running.take() {
            if let Err(e) = previous.task.await {
                tracing::error!("Previous listener task failed: {}", e);
            }
        }

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let addr = listener.local_addr()?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let shutdown = Arc::new(shutdown);

        let rpc = RpcState {
            sink: self.sink.clone(),
            shutdown: shutdown.clone(),
            close_requested: Arc::new(AtomicBool::new(false)),
        };

        self.state.send_replace(ListenerState::Running);
        tracing::info!(%addr, "Listening for platform calls");

        let task = tokio::spawn(run(listener, rpc, shutdown_rx, self.state.clone()));

        self.running = Some(Running {
            addr,
            shutdown,
            task,
        });

        Ok(addr)
    }

    /// Stop accepting calls and release the port
    ///
    /// Returns once the server task has exited. Stopping a stopped listener
    /// does nothing.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.shutdown.send_replace(true);
        if let Err(e) = running.task.await {
            tracing::error!("Listener task failed: {}", e);
        }
        self.state.send_replace(ListenerState::Stopped);
    }

    /// Wait until the listener is stopped, by `stop()` or by the platform
    pub async fn wait_stopped(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == ListenerState::Stopped).await;
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.shutdown.send_replace(true);
        }
    }
}

/// Shared by every request handler of one running listener
#[derive(Clone)]
struct RpcState {
    sink: DisplaySink,
    shutdown: Arc<watch::Sender<bool>>,
    close_requested: Arc<AtomicBool>,
}

fn router(rpc: RpcState) -> Router {
    Router::new()
        .route("/", get(describe).post(call))
        .route("/{*path}", post(call))
        .layer(DefaultBodyLimit::max(service::MAX_BODY))
        .with_state(rpc)
}

async fn run(
    listener: TcpListener,
    rpc: RpcState,
    shutdown_rx: watch::Receiver<bool>,
    state: Arc<watch::Sender<ListenerState>>,
) {
    let sink = rpc.sink.clone();
    let close_requested = rpc.close_requested.clone();

    if let Err(e) = service::serve(listener, router(rpc), shutdown_rx).await {
        tracing::error!("Listener failed: {}", e);
    }

    if close_requested.load(Ordering::SeqCst) {
        sink.request_close();
    }
    state.send_replace(ListenerState::Stopped);
    tracing::info!("Listener stopped");
}

async fn call(State(rpc): State<RpcState>, body: Bytes) -> MethodResponse {
    let outcome = handler::dispatch(&body, &rpc.sink);
    if outcome.close_after_response {
        // Graceful shutdown lets this response finish before the socket closes
        rpc.close_requested.store(true, Ordering::SeqCst);
        rpc.shutdown.send_replace(true);
    }
    outcome.response
}

async fn describe() -> String {
    handler::describe()
}
