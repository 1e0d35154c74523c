// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rstd: job orchestration daemon for destructive disk operations

use std::process::ExitCode;

use rst_daemon::{logging, startup, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("rstd: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = match logging::init(&config.log_path) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("rstd: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "daemon failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), LifecycleError> {
    info!(
        version = rst_daemon::env::VERSION,
        state_dir = %config.state_dir.display(),
        "starting rstd"
    );
    let mut terminate = signal(SignalKind::terminate())?;
    let daemon = startup(&config).await?;
    daemon
        .run(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
                _ = terminate.recv() => info!("received SIGTERM"),
            }
        })
        .await
}
