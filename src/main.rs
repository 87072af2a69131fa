//! Command line entry point.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use microstatic_rs::{HttpServer, ServerConfig};

/// Serve static files over HTTP/1.x.
#[derive(Debug, Parser)]
#[command(name = "microstatic", version, about)]
struct Args {
    /// Host to bind to
    #[arg(env = "MICROSTATIC_HOST")]
    host: Option<String>,

    /// Port to bind to
    #[arg(env = "MICROSTATIC_PORT")]
    port: Option<u16>,

    /// Number of workers processing connections
    #[arg(short, long, env = "MICROSTATIC_WORKERS")]
    workers: Option<usize>,

    /// Document root for static files
    #[arg(short, long, env = "MICROSTATIC_ROOT")]
    root: Option<PathBuf>,

    /// JSON config file; command line values override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen backlog and job queue capacity
    #[arg(long)]
    backlog: Option<usize>,

    /// Seconds a single socket read or write may stall
    #[arg(long)]
    idle_timeout: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, microstatic_rs::ServerError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.bind_host = host;
        }
        if let Some(port) = self.port {
            config.bind_port = port;
        }
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(root) = self.root {
            config.document_root = root;
        }
        if let Some(backlog) = self.backlog {
            config.backlog = backlog;
        }
        if let Some(secs) = self.idle_timeout {
            config.idle_timeout = std::time::Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} {}",
                buf.timestamp_seconds(),
                record.level().as_str().chars().next().unwrap_or('?'),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let server = match HttpServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Cannot start server: {e}");
            return ExitCode::FAILURE;
        }
    };

    let handle = server.handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown");
                handle.stop();
            }
            Err(e) => error!("Error setting up Ctrl+C handler: {e}"),
        }
    });

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {e}");
            ExitCode::FAILURE
        }
    }
}
