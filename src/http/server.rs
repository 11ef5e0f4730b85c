//! Range streaming server
//!
//! Serves `HEAD /video/{id}` and `GET /video/{id}` over HTTP/1.1, one
//! request per connection, with single byte-range support.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::command::Services;
use crate::config::Config;
use crate::error::{LmsError, Result};
use crate::network::{serve_connections, ConnectionLimiter, ShutdownHandle};
use crate::store::MetadataStore;
use crate::transfer::resolve_stored_file;

use super::range::{parse_range_header, unsatisfied_range};
use super::response::Response;

/// Most request headers httparse will accept
const MAX_HEADERS: usize = 32;

/// Route prefix for video resources
const VIDEO_PREFIX: &str = "/video/";

/// Deadline for writing a 503 to a client over the limit
const REJECT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// The parts of a request head the server acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub range: Option<String>,
}

/// Read and parse one request head
///
/// Returns `Ok(None)` when the peer closes before sending anything. Heads
/// longer than `max_bytes`, truncated heads and heads httparse rejects are
/// `Http` errors.
pub fn read_request_head<R: BufRead + ?Sized>(reader: &mut R, max_bytes: usize) -> Result<Option<RequestHead>> {
    let mut buf: Vec<u8> = Vec::with_capacity(1024);

    loop {
        let remaining = max_bytes.saturating_sub(buf.len()).saturating_add(1) as u64;
        let n = (&mut *reader).take(remaining).read_until(b'\n', &mut buf)?;

        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(LmsError::Http("connection closed inside request head".to_string()));
        }
        if buf.len() > max_bytes {
            return Err(LmsError::Http(format!("request head exceeds {} bytes", max_bytes)));
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        match req.parse(&buf) {
            Ok(httparse::Status::Complete(_)) => {
                let method = req.method.unwrap_or_default().to_string();
                let path = req.path.unwrap_or_default().to_string();
                let range = req
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("range"))
                    .map(|h| String::from_utf8_lossy(h.value).into_owned());
                return Ok(Some(RequestHead { method, path, range }));
            }
            Ok(httparse::Status::Partial) => continue,
            Err(e) => return Err(LmsError::Http(e.to_string())),
        }
    }
}

/// Maps requests to responses
pub struct VideoService {
    store: Arc<dyn MetadataStore>,
    videos_dir: PathBuf,
}

impl VideoService {
    pub fn new(store: Arc<dyn MetadataStore>, videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            videos_dir: videos_dir.into(),
        }
    }

    /// Build the response for one request
    pub fn respond(&self, method: &str, path: &str, range: Option<&str>) -> Response {
        let head_only = match method {
            "GET" => false,
            "HEAD" => true,
            _ => return Response::new(405).header("Allow", "GET, HEAD"),
        };

        let Some(video_id) = video_id(path) else {
            return Response::new(404);
        };

        let file_name = match self.store.video_file(video_id) {
            Ok(Some(name)) => name,
            Ok(None) => return Response::new(404),
            Err(e) => {
                tracing::error!(video = %video_id, "Video lookup failed: {}", e);
                return Response::new(500);
            }
        };

        let Some(file_path) = resolve_stored_file(&self.videos_dir, &file_name) else {
            tracing::warn!(video = %video_id, file = %file_name, "Stored video name does not resolve");
            return Response::new(404);
        };

        let file = match File::open(&file_path) {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(path = %file_path.display(), "Video file unavailable: {}", e);
                return Response::new(404);
            }
        };
        let total = match file.metadata() {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Response::new(404),
        };

        if head_only {
            return Response::new(200).content_length(total);
        }

        match range {
            None => Response::new(200).file_body(file, 0, total),
            Some(value) => match parse_range_header(value, total) {
                Ok(slice) => Response::new(206)
                    .header("Content-Range", slice.content_range())
                    .file_body(file, slice.start, slice.len()),
                Err(e) => {
                    tracing::info!(video = %video_id, range = %value, "Rejecting range: {}", e);
                    Response::new(416).header("Content-Range", unsatisfied_range(total))
                }
            },
        }
    }
}

/// Numeric id from `/video/{id}`, ignoring any query string
fn video_id(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let id = path.strip_prefix(VIDEO_PREFIX)?;
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
}

/// HTTP server for lecture videos
pub struct VideoServer {
    config: Config,
    service: Arc<VideoService>,
    listener: Option<TcpListener>,
    limiter: ConnectionLimiter,
    shutdown: ShutdownHandle,
}

impl VideoServer {
    /// Create a server reading videos through the shared services
    pub fn new(config: Config, services: &Services) -> Self {
        let service = VideoService::new(Arc::clone(&services.store), services.videos_dir.clone());
        let limiter = ConnectionLimiter::new(config.max_connections);
        Self {
            config,
            service: Arc::new(service),
            listener: None,
            limiter,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Bind the configured HTTP address; returns the actual local address
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.http_listen_addr)?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serve until shutdown (blocking)
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| LmsError::Internal("listener not bound".to_string()))?;

        tracing::info!(addr = %listener.local_addr()?, "Video server listening");

        let service = Arc::clone(&self.service);
        let settings = StreamSettings {
            read_timeout_ms: self.config.read_timeout_ms,
            write_timeout_ms: self.config.write_timeout_ms,
            max_header_bytes: self.config.max_header_bytes,
            chunk_size: self.config.chunk_size,
        };

        serve_connections(
            "http",
            listener,
            &self.limiter,
            &self.shutdown,
            move |stream| handle_stream(stream, &service, settings),
            move |stream| reject_busy(stream, settings.chunk_size),
        )
    }

    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

#[derive(Debug, Clone, Copy)]
struct StreamSettings {
    read_timeout_ms: u64,
    write_timeout_ms: u64,
    max_header_bytes: usize,
    chunk_size: usize,
}

fn handle_stream(stream: TcpStream, service: &VideoService, settings: StreamSettings) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    if let Err(e) = serve_one(stream, service, settings, &peer) {
        match &e {
            LmsError::Io(io) if is_disconnect(io.kind()) => {
                tracing::debug!(%peer, "HTTP client went away: {}", e)
            }
            LmsError::PrematureEof { .. } => tracing::warn!(%peer, "Video file shrank while streaming: {}", e),
            _ => tracing::warn!(%peer, "HTTP connection failed: {}", e),
        }
    }
}

fn serve_one(stream: TcpStream, service: &VideoService, settings: StreamSettings, peer: &str) -> Result<()> {
    stream.set_nodelay(true)?;
    if settings.read_timeout_ms > 0 {
        stream.set_read_timeout(Some(Duration::from_millis(settings.read_timeout_ms)))?;
    }
    if settings.write_timeout_ms > 0 {
        stream.set_write_timeout(Some(Duration::from_millis(settings.write_timeout_ms)))?;
    }

    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    let response = match read_request_head(&mut reader, settings.max_header_bytes) {
        Ok(Some(head)) => {
            let response = service.respond(&head.method, &head.path, head.range.as_deref());
            tracing::debug!(
                %peer,
                method = %head.method,
                path = %head.path,
                status = response.status(),
                content_range = response.header_value("Content-Range").unwrap_or("-"),
                "HTTP request"
            );
            response
        }
        Ok(None) => return Ok(()),
        Err(LmsError::Http(reason)) => {
            tracing::info!(%peer, "Malformed HTTP request: {}", reason);
            Response::new(400)
        }
        Err(e) => return Err(e),
    };

    let sent = response.write_to(&mut writer, settings.chunk_size)?;
    tracing::debug!(%peer, bytes = sent, "HTTP response sent");
    Ok(())
}

fn reject_busy(mut stream: TcpStream, chunk_size: usize) {
    let _ = stream.set_write_timeout(Some(REJECT_WRITE_TIMEOUT));
    if let Err(e) = Response::new(503).write_to(&mut stream, chunk_size) {
        tracing::debug!("Could not deliver 503: {}", e);
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
