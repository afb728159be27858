//! # Pool Server - Entry Point
//! src/main.rs
//!
//! Parsea la configuración, inicializa los logs, arranca el servidor y
//! espera SIGINT/SIGTERM para apagarlo.

use pool_server::config::Config;
use pool_server::server::{install_signal_handler, Server};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = Config::new();

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();

    config.print_summary();

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = install_signal_handler(server.shutdown_handle()) {
        error!(error = %e, "startup failed");
        return ExitCode::FAILURE;
    }

    match server.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server exited with errors");
            ExitCode::FAILURE
        }
    }
}
