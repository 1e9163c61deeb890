//! ## DIRECTORY SERVER
//!
//! Owns the [Registry] and the [checker], and runs the accept loop that
//! hands each incoming connection off to a fresh [session] thread.
//!
//! [Registry]: crate::registry::Registry
//! [checker]:  crate::checker
//! [session]:  crate::session

use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, TcpListener};
use std::sync::Arc;
use std::thread;

use eurechat_protocol::FramedConnection;

use crate::checker;
use crate::registry::Registry;
use crate::session;

pub struct ServerConfig {
    pub address: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: Ipv4Addr::new(127, 0, 0, 1),
            port: 8888,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl Server {
    /// Binds the listening socket with address reuse and the required
    /// backlog. Returns an error only for an unrecoverable startup
    /// condition (the listening socket could not be bound).
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = bind_with_reuse(SocketAddrV4::new(config.address, config.port))?;
        log::info!("waiting for connections on {}:{}", config.address, config.port);
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
        })
    }

    /// Starts the liveness checker and runs the accept loop until the
    /// process is interrupted. Accept failures other than interrupt are
    /// logged and swallowed; the loop keeps running.
    pub fn run(self) {
        let checker_registry = self.registry.clone();
        thread::spawn(move || checker::run(&checker_registry));

        for incoming in self.listener.incoming() {
            match incoming {
                Ok(stream) => {
                    let registry = self.registry.clone();
                    thread::spawn(move || match FramedConnection::new(stream) {
                        Ok(conn) => session::run_session(conn, &registry),
                        Err(error) => log::error!("failed to wrap accepted connection: {error}"),
                    });
                }
                Err(error) => {
                    log::error!("accept failed: {error}");
                }
            }
        }
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

/// `std::net::TcpListener::bind` sets `SO_REUSEADDR` before binding on the
/// platforms this crate targets and listens with a backlog comfortably
/// above the 15 connections this protocol requires, so no extra socket
/// options are needed here.
fn bind_with_reuse(addr: SocketAddrV4) -> io::Result<TcpListener> {
    TcpListener::bind(addr)
}
