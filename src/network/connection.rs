//! Connection Handler
//!
//! Handles one line-protocol connection: one header line, one dispatch,
//! then close.

use std::any::Any;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::TcpStream;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::command::{CommandRegistry, Exchange, Services};
use crate::error::{LmsError, Result};
use crate::protocol::{read_line, write_frame, Frame, Request};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered; payload bytes are read through it too)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared handler services
    services: Arc<Services>,

    /// Verb table
    registry: Arc<CommandRegistry>,

    /// Longest accepted header line
    max_header_bytes: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O on two handles of the same socket
    pub fn new(
        stream: TcpStream,
        services: Arc<Services>,
        registry: Arc<CommandRegistry>,
        max_header_bytes: usize,
    ) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm so small frames go out immediately
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            services,
            registry,
            max_header_bytes,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves a direction without a deadline)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until the request is answered)
    ///
    /// Reads one header line, dispatches it and flushes the response. Handler
    /// failures become a single `ERR|CODE` frame; they are not returned.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        // Step 1: Read the header line
        let line = match read_line(&mut self.reader, self.max_header_bytes) {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!("Client {} closed without a request", self.peer_addr);
                return Ok(());
            }
            Err(e) if is_disconnect(&e) => {
                tracing::debug!("Client {} went away before a request: {}", self.peer_addr, e);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Error reading header from {}: {}", self.peer_addr, e);
                self.send_error(&e);
                let _ = self.writer.flush();
                return Err(e);
            }
        };

        // Step 2: Parse and dispatch
        let request = Request::parse(&line);
        tracing::debug!(
            peer = %self.peer_addr,
            verb = %request.verb,
            fields = request.fields.len(),
            "Received request"
        );

        let result = {
            let mut exchange = Exchange {
                reader: &mut self.reader,
                writer: &mut self.writer,
                peer: &self.peer_addr,
            };
            let registry = &self.registry;
            let services = &self.services;
            panic::catch_unwind(AssertUnwindSafe(|| registry.dispatch(services, &request, &mut exchange)))
                .unwrap_or_else(|payload| {
                    Err(LmsError::Internal(format!("handler panicked: {}", panic_message(payload.as_ref()))))
                })
        };

        // Step 3: Convert a failure (or a handler panic) into one error frame
        if let Err(e) = result {
            self.log_failure(&request.verb, &e);
            self.send_error(&e);
        }

        if let Err(e) = self.writer.flush() {
            tracing::debug!("Client {} disconnected before flush: {}", self.peer_addr, e);
        }

        tracing::debug!("Client {} done", self.peer_addr);
        Ok(())
    }

    /// Best-effort `ERR|CODE`; a broken socket is ignored
    fn send_error(&mut self, error: &LmsError) {
        if let Err(e) = write_frame(&mut self.writer, &Frame::Error(error.code())) {
            tracing::debug!(
                "Could not send {} to {}: {}",
                error.code(),
                self.peer_addr,
                e
            );
        }
    }

    fn log_failure(&self, verb: &str, error: &LmsError) {
        if is_disconnect(error) {
            tracing::debug!(peer = %self.peer_addr, verb, code = %error.code(), "Client disconnected: {}", error);
        } else if error.is_client_error() {
            tracing::info!(peer = %self.peer_addr, verb, code = %error.code(), "Request rejected: {}", error);
        } else {
            tracing::warn!(peer = %self.peer_addr, verb, code = %error.code(), "Request failed: {}", error);
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

/// Whether an error means the peer is gone or stalled past its deadline
fn is_disconnect(error: &LmsError) -> bool {
    match error {
        LmsError::Io(e) => matches!(
            e.kind(),
            ErrorKind::UnexpectedEof
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::WouldBlock
                | ErrorKind::TimedOut
        ),
        _ => false,
    }
}
