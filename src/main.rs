// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `lampy` daemon entry point.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lampy::bridge::EnvCredentials;
use lampy::{
    AuthOptions, Bridge, BridgeConfig, BridgeEndpoint, Error, HttpCalendar, Lampy, Schedule,
    ScheduleOptions,
};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> lampy::Result<()> {
    let source = HttpCalendar::new(&cli.schedule)?;
    let bridge = connect(cli, &BridgeConfig::default()).await?;

    let auth = AuthOptions::new(&cli.app_name, &cli.instance).with_credential_source(EnvCredentials);
    bridge.authenticate(&auth).await?;

    let schedule = Schedule::new(source, ScheduleOptions::default());
    let lampy = Lampy::start(bridge, schedule, cli.daemon_options()).await?;
    lampy.run(shutdown_signal()).await;

    tracing::info!("Goodbye");
    Ok(())
}

/// Finds the bridge on the network, falling back to the configured address.
async fn connect(cli: &Cli, config: &BridgeConfig) -> lampy::Result<Bridge> {
    #[cfg(feature = "mdns")]
    {
        match Bridge::discover(&cli.discovery_options(), config).await {
            Ok(bridge) => return Ok(bridge),
            Err(e) => tracing::warn!(phase = "discovery", error = %e, "Could not discover bridge"),
        }
    }

    let Some(address) = cli.bridge else {
        tracing::error!(phase = "discovery", "No bridge found and no fallback address configured");
        return Err(Error::NotFound);
    };
    tracing::info!(phase = "discovery", %address, "Using configured bridge address");
    Bridge::with_config(BridgeEndpoint::from_address(address), config)
}

/// Completes on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Ctrl-C received"),
        () = terminate => tracing::info!("SIGTERM received"),
    }
}
