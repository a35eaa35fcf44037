// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! weaverd: entry point for the Nexus Weaver node supervisor.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use weaver_daemon::lifecycle::{self, Config, DaemonState};
use weaver_daemon::listener::{ListenCtx, Listener};
use weaver_daemon::env;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("weaverd: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_tracing(&config) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("weaverd: failed to initialize logging: {}", err);
            return ExitCode::FAILURE;
        }
    };
    info!(version = env::VERSION, "starting weaverd");

    let (daemon, listener) = match lifecycle::startup(config).await {
        Ok(result) => result,
        Err(err) => {
            error!(error = %err, "startup failed");
            eprintln!("weaverd: {}", err);
            return ExitCode::FAILURE;
        }
    };

    run(daemon, listener).await;

    info!("weaverd exited cleanly");
    ExitCode::SUCCESS
}

/// Serve until a shutdown signal or request arrives, then tear down.
async fn run(daemon: DaemonState, listener: tokio::net::UnixListener) {
    let ctx = Arc::new(ListenCtx {
        supervisor: Arc::clone(&daemon.supervisor),
        start_time: daemon.start_time,
        shutdown: Arc::clone(&daemon.shutdown),
    });
    let listener_task = tokio::spawn(Listener::new(listener, ctx).run());

    wait_for_shutdown(&daemon).await;

    // Stop accepting requests before retiring workloads; in-flight
    // connections finish on their own timeouts.
    listener_task.abort();
    daemon.shutdown().await;
}

async fn wait_for_shutdown(daemon: &DaemonState) {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            // Without the handler the daemon still stops on ctrl-c or a
            // Shutdown request.
            error!(error = %err, "failed to install SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
                _ = daemon.shutdown.notified() => info!("received shutdown request"),
            }
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = daemon.shutdown.notified() => info!("received shutdown request"),
    }
}

/// Log to `<state_dir>/weaverd.log` with the `NW_LOG` filter.
fn init_tracing(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    std::fs::create_dir_all(&config.state_dir)?;
    let file = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = tracing_subscriber::EnvFilter::try_new(env::log_filter())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();

    Ok(guard)
}
