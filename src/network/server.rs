//! TCP Server
//!
//! Accepts connections and hands each one to its own worker thread.

use std::io::{ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::command::{CommandRegistry, Services};
use crate::config::Config;
use crate::error::{LmsError, Result};
use crate::protocol::{ErrorCode, Frame};

use super::connection::Connection;
use super::limiter::ConnectionLimiter;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Deadline for writing a rejection to a client over the limit
const REJECT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Cloneable stop signal shared between a server and its owner
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the accept loop to stop; in-flight connections finish on their own
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Accept loop shared by the line and HTTP servers
///
/// Polls a nonblocking listener until `shutdown` fires. Accepted sockets get a
/// permit and a named worker thread running `serve`; when the limiter is full
/// the socket goes to `reject` on the acceptor thread instead.
pub(crate) fn serve_connections<S, R>(
    label: &str,
    listener: &TcpListener,
    limiter: &ConnectionLimiter,
    shutdown: &ShutdownHandle,
    serve: S,
    reject: R,
) -> Result<()>
where
    S: Fn(TcpStream) + Send + Sync + 'static,
    R: Fn(TcpStream),
{
    listener.set_nonblocking(true)?;
    let serve = Arc::new(serve);
    let mut next_id: u64 = 0;

    while !shutdown.is_shutdown() {
        match listener.accept() {
            Ok((stream, peer)) => {
                // Workers do blocking I/O with timeouts
                if let Err(e) = stream.set_nonblocking(false) {
                    tracing::warn!(%peer, "Failed to configure accepted socket: {}", e);
                    continue;
                }

                let Some(permit) = limiter.try_acquire() else {
                    tracing::warn!(
                        %peer,
                        active = limiter.active(),
                        "{} connection limit reached, rejecting",
                        label
                    );
                    reject(stream);
                    continue;
                };

                next_id += 1;
                let serve = Arc::clone(&serve);
                let spawned = thread::Builder::new()
                    .name(format!("{}-conn-{}", label, next_id))
                    .spawn(move || {
                        let _permit = permit;
                        serve(stream);
                    });
                if let Err(e) = spawned {
                    tracing::error!(%peer, "Failed to spawn connection worker: {}", e);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("{} accept failed: {}", label, e);
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }

    tracing::info!("{} listener stopped", label);
    Ok(())
}

/// Line-protocol TCP server
pub struct LineServer {
    config: Config,
    services: Arc<Services>,
    registry: Arc<CommandRegistry>,
    listener: Option<TcpListener>,
    limiter: ConnectionLimiter,
    shutdown: ShutdownHandle,
}

impl LineServer {
    /// Create a new server serving the standard verb table
    pub fn new(config: Config, services: Arc<Services>) -> Self {
        Self::with_registry(config, services, CommandRegistry::standard())
    }

    /// Create a server with a custom verb table
    pub fn with_registry(config: Config, services: Arc<Services>, registry: CommandRegistry) -> Self {
        let limiter = ConnectionLimiter::new(config.max_connections);
        Self {
            config,
            services,
            registry: Arc::new(registry),
            listener: None,
            limiter,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Bind the configured address; returns the actual local address
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr)?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Address the server is bound to, if any
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Handle that stops `run` from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| LmsError::Internal("listener not bound".to_string()))?;

        tracing::info!(
            addr = %listener.local_addr()?,
            max_connections = self.limiter.capacity(),
            "LMS server listening"
        );

        let services = Arc::clone(&self.services);
        let registry = Arc::clone(&self.registry);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;
        let max_header_bytes = self.config.max_header_bytes;

        serve_connections(
            "lms",
            listener,
            &self.limiter,
            &self.shutdown,
            move |stream| {
                let mut conn = match Connection::new(
                    stream,
                    Arc::clone(&services),
                    Arc::clone(&registry),
                    max_header_bytes,
                ) {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("Failed to set up connection: {}", e);
                        return;
                    }
                };
                if let Err(e) = conn.set_timeouts(read_ms, write_ms) {
                    tracing::warn!("Failed to set timeouts for {}: {}", conn.peer_addr(), e);
                    return;
                }
                if let Err(e) = conn.handle() {
                    tracing::debug!("Connection {} ended with error: {}", conn.peer_addr(), e);
                }
            },
            reject_busy,
        )
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

fn reject_busy(mut stream: TcpStream) {
    let _ = stream.set_write_timeout(Some(REJECT_WRITE_TIMEOUT));
    let line = Frame::Error(ErrorCode::ServerBusy).encode();
    if let Err(e) = stream.write_all(line.as_bytes()).and_then(|_| stream.flush()) {
        tracing::debug!("Could not deliver busy rejection: {}", e);
    }
}
