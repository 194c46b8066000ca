//! Local MCP HTTP server host utilities.

use std::net::{IpAddr, SocketAddr};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use anyhow::{Result, anyhow};
use axum::Router;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tollgate_engine::ToolDispatcher;
use tracing::info;

use crate::server::core::TollgateMcpCore;

/// Bind address used when none is configured.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8787";

/// Log entry emitted for each tool call and workflow progress event.
#[derive(Debug, Clone)]
pub struct McpHttpLogEntry {
    /// Human-readable summary for list display.
    pub message: String,
    /// Optional structured payload for detail inspection.
    pub payload: Option<Value>,
}

impl McpHttpLogEntry {
    /// Create a new MCP HTTP log entry.
    pub fn new(message: String, payload: Option<Value>) -> Self {
        Self { message, payload }
    }
}

/// Streamable HTTP host for [`TollgateMcpCore`], served under `/mcp`.
#[derive(Clone)]
pub struct McpHttpServer {
    bind_address: SocketAddr,
    log_sender: Option<UnboundedSender<McpHttpLogEntry>>,
    dispatcher: Arc<ToolDispatcher>,
}

impl McpHttpServer {
    /// Every session shares `dispatcher`, and with it the todo board.
    pub fn new(bind_address: SocketAddr, dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            bind_address,
            log_sender: None,
            dispatcher,
        }
    }

    /// Attach a log sender to stream request/response events to the caller.
    pub fn with_log_sender(mut self, log_sender: UnboundedSender<McpHttpLogEntry>) -> Self {
        self.log_sender = Some(log_sender);
        self
    }

    /// Start the server and return a handle for runtime inspection and shutdown.
    pub async fn start(self) -> Result<RunningMcpHttpServer> {
        let cancellation_token = CancellationToken::new();
        let session_manager = Arc::new(LocalSessionManager::default());
        let client_counter = Arc::new(AtomicUsize::new(0));
        let monitor_handle = spawn_session_monitor(
            Arc::clone(&session_manager),
            Arc::clone(&client_counter),
            cancellation_token.child_token(),
        );

        let log_sender = self.log_sender.clone();
        let dispatcher = Arc::clone(&self.dispatcher);
        let service: StreamableHttpService<TollgateMcpCore, LocalSessionManager> = StreamableHttpService::new(
            move || Ok(TollgateMcpCore::new(log_sender.clone(), Arc::clone(&dispatcher))),
            Arc::clone(&session_manager),
            StreamableHttpServerConfig {
                stateful_mode: true,
                sse_keep_alive: None,
                cancellation_token: cancellation_token.child_token(),
                ..Default::default()
            },
        );

        let router = Router::new().nest_service("/mcp", service);
        let listener = tokio::net::TcpListener::bind(self.bind_address).await?;
        let bound_address = listener.local_addr()?;
        info!(address = %bound_address, operations = self.dispatcher.catalog().len(), "mcp http server listening");

        let server_handle = tokio::spawn({
            let shutdown = cancellation_token.child_token();
            async move {
                let _ = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown.cancelled().await;
                    })
                    .await;
            }
        });

        Ok(RunningMcpHttpServer {
            bind_address: bound_address,
            cancellation_token,
            server_handle,
            monitor_handle,
            client_counter,
        })
    }
}

/// Runtime handle for a running MCP HTTP server.
#[derive(Debug)]
pub struct RunningMcpHttpServer {
    bind_address: SocketAddr,
    cancellation_token: CancellationToken,
    server_handle: JoinHandle<()>,
    monitor_handle: JoinHandle<()>,
    client_counter: Arc<AtomicUsize>,
}

impl RunningMcpHttpServer {
    /// Return the bound socket address for the running server.
    pub fn bound_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Sessions seen by the last monitor tick.
    pub fn connected_clients(&self) -> usize {
        self.client_counter.load(Ordering::Relaxed)
    }

    /// Stop the server and wait for background tasks to finish.
    pub async fn stop(self) -> Result<()> {
        info!(address = %self.bind_address, "mcp http server stopping");
        self.cancellation_token.cancel();
        self.monitor_handle
            .await
            .map_err(|error| anyhow!("MCP HTTP monitor task failed: {error}"))?;
        self.server_handle
            .await
            .map_err(|error| anyhow!("MCP HTTP server task failed: {error}"))?;
        Ok(())
    }
}

/// Parses the bind address, defaulting to [`DEFAULT_BIND_ADDRESS`].
///
/// Only loopback addresses are accepted.
pub fn resolve_bind_address(bind_address: Option<&str>) -> Result<SocketAddr> {
    let address = bind_address.unwrap_or(DEFAULT_BIND_ADDRESS);
    let parsed: SocketAddr = address
        .parse()
        .map_err(|error| anyhow!("invalid MCP HTTP bind address '{address}': {error}"))?;
    if !is_loopback(parsed.ip()) {
        return Err(anyhow!("MCP HTTP server must bind to a loopback address"));
    }
    Ok(parsed)
}

fn is_loopback(address: IpAddr) -> bool {
    match address {
        IpAddr::V4(ip) => ip.is_loopback(),
        IpAddr::V6(ip) => ip.is_loopback(),
    }
}

fn spawn_session_monitor(
    session_manager: Arc<LocalSessionManager>,
    client_counter: Arc<AtomicUsize>,
    cancellation_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = ticker.tick() => {
                    let count = session_manager.sessions.read().await.len();
                    client_counter.store(count, Ordering::Relaxed);
                }
            }
        }
    })
}
