// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Runs as a spawned task, accepting connections and serving one
//! request/response exchange per connection without blocking the main
//! shutdown wait. All engine work happens through the shared
//! [`DaemonSupervisor`].

use std::sync::Arc;
use std::time::Instant;

use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use weaver_supervisor::DaemonSupervisor;

use crate::env::{ipc_timeout, VERSION};
use crate::protocol::{self, ProtocolError, Request, Response, StatusEntry, WorkloadEntry};

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub supervisor: Arc<DaemonSupervisor>,
    pub start_time: Instant,
    /// Signaled when a Shutdown request arrives.
    pub shutdown: Arc<Notify>,
}

/// Listener task for accepting socket connections.
pub struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Run the accept loop, spawning a task per connection.
    pub async fn run(self) {
        loop {
            match self.unix.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        let (mut reader, mut writer) = stream.into_split();
                        if let Err(err) = handle_connection(&mut reader, &mut writer, &ctx).await
                        {
                            log_connection_error(err);
                        }
                    });
                }
                Err(err) => error!(error = %err, "accept failed"),
            }
        }
    }
}

fn log_connection_error(err: ProtocolError) {
    match err {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        ProtocolError::Timeout => warn!("connection timed out"),
        _ => error!(error = %err, "connection error"),
    }
}

/// Handle a single client connection: one request, one response.
async fn handle_connection<R, W>(
    reader: &mut R,
    writer: &mut W,
    ctx: &ListenCtx,
) -> Result<(), ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let request = protocol::read_request(reader, ipc_timeout()).await?;

    // Queries are frequent control-plane polling; log them quietly.
    match &request {
        Request::Health | Request::Get { .. } | Request::List | Request::Status
        | Request::Stats { .. } => {
            debug!(request = ?request, "received query");
        }
        _ => info!(request = ?request, "received request"),
    }

    let response = handle_request(request, ctx).await;
    protocol::write_response(writer, &response, ipc_timeout()).await
}

/// Handle a single request and return a response.
///
/// Per-request errors are mapped onto the wire and never crash the
/// daemon.
pub async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Health => Response::Health { version: VERSION.to_string() },

        Request::Start { spec } => match ctx.supervisor.start(spec) {
            Ok(id) => Response::Started { id: id.to_string() },
            Err(err) => Response::error(&err),
        },

        Request::Stop { id } => match ctx.supervisor.stop(&id).await {
            Ok(()) => Response::Ok,
            Err(err) => Response::error(&err),
        },

        Request::Get { id } => match ctx.supervisor.get(&id) {
            Ok(snap) => Response::Workload { workload: WorkloadEntry::from(&snap) },
            Err(err) => Response::error(&err),
        },

        Request::List => {
            let workloads = ctx.supervisor.list().iter().map(WorkloadEntry::from).collect();
            Response::Workloads { workloads }
        }

        Request::UpdateLimits { id, limits } => {
            match ctx.supervisor.update_limits(&id, limits) {
                Ok(()) => Response::Ok,
                Err(err) => Response::error(&err),
            }
        }

        Request::Stats { id } => match ctx.supervisor.stats(&id) {
            Ok(stats) => Response::Stats { stats },
            Err(err) => Response::error(&err),
        },

        Request::Status => status(ctx),

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

fn status(ctx: &ListenCtx) -> Response {
    let snapshots = ctx.supervisor.list();
    let running = snapshots.iter().filter(|s| s.state == weaver_core::WorkloadState::Running).count();
    let stopping =
        snapshots.iter().filter(|s| s.state == weaver_core::WorkloadState::Stopping).count();
    let terminal = snapshots.iter().filter(|s| s.state.is_terminal()).count();

    Response::Status {
        status: StatusEntry {
            version: VERSION.to_string(),
            uptime_ms: ctx.start_time.elapsed().as_millis() as u64,
            workloads: snapshots.len(),
            running,
            stopping,
            terminal,
            counters: ctx.supervisor.counters(),
        },
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
