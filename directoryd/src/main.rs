//! ## DIRECTORY DAEMON
//!
//! Binary entry point for the directory service: parses the CLI surface,
//! sets up logging, binds the listening socket and runs the accept loop
//! until interrupted.

use std::process::ExitCode;

use clap::Parser;
use eurechat_directory::{Server, ServerConfig};

/// Central directory service for the eurechat peer network.
#[derive(Parser)]
#[command(name = "directoryd", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    address: std::net::Ipv4Addr,

    /// Port to listen on.
    #[arg(long, default_value_t = 8888)]
    port: u16,

    /// Raise the log level from INFO to DEBUG.
    #[arg(short, long)]
    verbose: bool,

    /// Run as a background daemon. Accepted for interface compatibility;
    /// this implementation does not fork.
    #[arg(long)]
    daemon: bool,

    /// Redirect log output to this file. Accepted for interface
    /// compatibility; logs currently always go to stderr.
    #[arg(long)]
    logfile: Option<std::path::PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if args.daemon {
        log::warn!("--daemon was requested but this build does not fork; running in the foreground");
    }
    if let Some(path) = &args.logfile {
        log::warn!("--logfile {} was requested but log output still goes to stderr", path.display());
    }

    let config = ServerConfig {
        address: args.address,
        port: args.port,
    };

    match Server::bind(config) {
        Ok(server) => {
            server.run();
            ExitCode::SUCCESS
        }
        Err(error) => {
            log::error!("failed to bind listening socket: {error}");
            ExitCode::FAILURE
        }
    }
}
