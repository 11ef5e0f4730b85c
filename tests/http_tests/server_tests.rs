//! Video Server Tests
//!
//! Request routing through `VideoService`, head parsing, and full responses
//! over real loopback sockets.

use std::fs;
use std::io::{BufReader, Cursor, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lms::command::{CommandRegistry, Exchange, Services};
use lms::http::{read_request_head, Body, VideoServer, VideoService};
use lms::protocol::Request;
use lms::store::{MemoryStore, MetadataStore};
use lms::{Config, LmsError, ShutdownHandle};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn video_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Store with one 1000-byte video; returns (temp, service, video id)
fn service_with_video() -> (TempDir, VideoService, String) {
    let temp = TempDir::new().unwrap();
    let videos = temp.path().join("videos");
    fs::create_dir_all(&videos).unwrap();
    fs::write(videos.join("1_prof_x_lecture.mp4"), video_bytes(1000)).unwrap();

    let store = Arc::new(MemoryStore::new());
    let id = store.create_video(1, "1_prof_x_lecture.mp4").unwrap().to_string();
    let service = VideoService::new(store, videos);
    (temp, service, id)
}

/// Parsed HTTP response: status, lower-cased headers, body
struct RawResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RawResponse {
    fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response head terminator");
        let head = String::from_utf8(raw[..split].to_vec()).unwrap();
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let status = status_line.split(' ').nth(1).unwrap().parse().unwrap();
        let headers = lines
            .map(|l| {
                let (name, value) = l.split_once(": ").unwrap();
                (name.to_ascii_lowercase(), value.to_string())
            })
            .collect();
        Self {
            status,
            headers,
            body: raw[split + 4..].to_vec(),
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

fn render(service: &VideoService, method: &str, path: &str, range: Option<&str>) -> RawResponse {
    let mut out = Vec::new();
    service
        .respond(method, path, range)
        .write_to(&mut out, 64)
        .unwrap();
    RawResponse::parse(&out)
}

fn start_server(temp: &TempDir, store: Arc<MemoryStore>, max_connections: usize) -> (SocketAddr, ShutdownHandle, thread::JoinHandle<()>) {
    let config = Config::builder()
        .data_dir(temp.path())
        .http_listen_addr("127.0.0.1:0")
        .max_connections(max_connections)
        .read_timeout_ms(2_000)
        .write_timeout_ms(2_000)
        .build();
    let services = Services::new(&config, store).unwrap();

    let mut server = VideoServer::new(config, &services);
    let addr = server.bind().unwrap();
    let shutdown = server.shutdown_handle();
    let handle = thread::spawn(move || {
        server.run().unwrap();
    });
    (addr, shutdown, handle)
}

fn http_get(addr: SocketAddr, request: &str) -> RawResponse {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).unwrap();
    RawResponse::parse(&raw)
}

// =============================================================================
// Request Head Parsing Tests
// =============================================================================

#[test]
fn test_read_request_head_with_range() {
    let raw = b"GET /video/12 HTTP/1.1\r\nHost: localhost\r\nRange: bytes=100-199\r\n\r\n";
    let mut reader = BufReader::new(Cursor::new(raw.to_vec()));
    let head = read_request_head(&mut reader, 8192).unwrap().unwrap();
    assert_eq!(head.method, "GET");
    assert_eq!(head.path, "/video/12");
    assert_eq!(head.range.as_deref(), Some("bytes=100-199"));
}

#[test]
fn test_read_request_head_range_header_case() {
    let raw = b"HEAD /video/1 HTTP/1.1\r\nrange: bytes=0-\r\n\r\n";
    let mut reader = BufReader::new(Cursor::new(raw.to_vec()));
    let head = read_request_head(&mut reader, 8192).unwrap().unwrap();
    assert_eq!(head.method, "HEAD");
    assert_eq!(head.range.as_deref(), Some("bytes=0-"));
}

#[test]
fn test_read_request_head_eof() {
    let mut reader = BufReader::new(Cursor::new(Vec::new()));
    assert_eq!(read_request_head(&mut reader, 8192).unwrap(), None);
}

#[test]
fn test_read_request_head_truncated() {
    let raw = b"GET /video/1 HTTP/1.1\r\nHost: x\r\n";
    let mut reader = BufReader::new(Cursor::new(raw.to_vec()));
    assert!(matches!(read_request_head(&mut reader, 8192), Err(LmsError::Http(_))));
}

#[test]
fn test_read_request_head_too_large() {
    let raw = format!("GET /video/1 HTTP/1.1\r\nX-Pad: {}\r\n\r\n", "a".repeat(10_000));
    let mut reader = BufReader::new(Cursor::new(raw.into_bytes()));
    assert!(matches!(read_request_head(&mut reader, 1024), Err(LmsError::Http(_))));
}

#[test]
fn test_read_request_head_garbage() {
    let mut reader = BufReader::new(Cursor::new(b"\x00\x01\x02 nonsense\r\n\r\n".to_vec()));
    assert!(matches!(read_request_head(&mut reader, 8192), Err(LmsError::Http(_))));
}

// =============================================================================
// Routing Tests
// =============================================================================

#[test]
fn test_get_whole_file() {
    let (_temp, service, id) = service_with_video();
    let response = render(&service, "GET", &format!("/video/{}", id), None);

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-length"), Some("1000"));
    assert_eq!(response.header("content-type"), Some("video/mp4"));
    assert_eq!(response.header("accept-ranges"), Some("bytes"));
    assert_eq!(response.header("connection"), Some("close"));
    assert_eq!(response.body, video_bytes(1000));
}

#[test]
fn test_get_partial_content() {
    let (_temp, service, id) = service_with_video();
    let response = render(&service, "GET", &format!("/video/{}", id), Some("bytes=100-199"));

    assert_eq!(response.status, 206);
    assert_eq!(response.header("content-range"), Some("bytes 100-199/1000"));
    assert_eq!(response.header("content-length"), Some("100"));
    assert_eq!(response.body, video_bytes(1000)[100..200].to_vec());
}

#[test]
fn test_get_open_ended_and_clamped() {
    let (_temp, service, id) = service_with_video();
    let path = format!("/video/{}", id);

    let open = render(&service, "GET", &path, Some("bytes=900-"));
    assert_eq!(open.status, 206);
    assert_eq!(open.header("content-range"), Some("bytes 900-999/1000"));
    assert_eq!(open.body.len(), 100);

    let clamped = render(&service, "GET", &path, Some("bytes=0-1100"));
    assert_eq!(clamped.header("content-range"), Some("bytes 0-999/1000"));
    assert_eq!(clamped.body.len(), 1000);
}

#[test]
fn test_unsatisfiable_range() {
    let (_temp, service, id) = service_with_video();
    let response = render(&service, "GET", &format!("/video/{}", id), Some("bytes=5000-"));

    assert_eq!(response.status, 416);
    assert_eq!(response.header("content-range"), Some("bytes */1000"));
    assert!(response.body.is_empty());
}

#[test]
fn test_head_reports_length_without_body() {
    let (_temp, service, id) = service_with_video();
    let response = service.respond("HEAD", &format!("/video/{}", id), None);

    assert_eq!(response.status(), 200);
    assert!(matches!(response.body(), Body::Empty));

    let parsed = render(&service, "HEAD", &format!("/video/{}", id), None);
    assert_eq!(parsed.header("content-length"), Some("1000"));
    assert!(parsed.body.is_empty());
}

#[test]
fn test_query_string_ignored() {
    let (_temp, service, id) = service_with_video();
    let response = render(&service, "GET", &format!("/video/{}?t=30", id), Some("bytes=0-9"));
    assert_eq!(response.status, 206);
}

#[test]
fn test_not_found_cases() {
    let (temp, service, _id) = service_with_video();

    assert_eq!(service.respond("GET", "/video/999", None).status(), 404);
    assert_eq!(service.respond("GET", "/video/abc", None).status(), 404);
    assert_eq!(service.respond("GET", "/video/", None).status(), 404);
    assert_eq!(service.respond("GET", "/other/1", None).status(), 404);
    assert_eq!(service.respond("GET", "/video/1/../../etc", None).status(), 404);

    // Record exists but the file is gone
    fs::remove_file(temp.path().join("videos").join("1_prof_x_lecture.mp4")).unwrap();
    assert_eq!(service.respond("GET", "/video/1", None).status(), 404);
}

#[test]
fn test_unsupported_method() {
    let (_temp, service, id) = service_with_video();
    let response = render(&service, "POST", &format!("/video/{}", id), None);
    assert_eq!(response.status, 405);
    assert_eq!(response.header("allow"), Some("GET, HEAD"));
}

#[test]
fn test_videos_registered_by_name_stream() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp.path()).build();
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(&config, store.clone()).unwrap();
    let registry = CommandRegistry::standard();
    let service = VideoService::new(store.clone(), services.videos_dir.clone());

    for (index, name) in ["week 1.mp4", "강의1.mp4"].into_iter().enumerate() {
        fs::write(services.videos_dir.join(name), video_bytes(300)).unwrap();

        let request = Request::parse(&format!("VIDEO_CREATE|prof|1|{}", name));
        let mut reader = Cursor::new(Vec::new());
        let mut writer = Vec::new();
        {
            let mut exchange = Exchange {
                reader: &mut reader,
                writer: &mut writer,
                peer: "test",
            };
            registry.dispatch(&services, &request, &mut exchange).unwrap();
        }
        assert_eq!(writer, b"OK\n");

        let path = format!("/video/{}", index + 1);
        let response = render(&service, "GET", &path, None);
        assert_eq!(response.status, 200, "{}", name);
        assert_eq!(response.body, video_bytes(300));

        let partial = service.respond("GET", &path, Some("bytes=100-"));
        assert_eq!(partial.status(), 206);
        assert_eq!(partial.header_value("content-range"), Some("bytes 100-299/300"));
    }
}

// =============================================================================
// Socket Tests
// =============================================================================

#[test]
fn test_server_partial_content_over_socket() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let id = store.create_video(1, "1_prof_x_lecture.mp4").unwrap();
    let (addr, shutdown, handle) = start_server(&temp, store, 8);
    fs::write(temp.path().join("videos").join("1_prof_x_lecture.mp4"), video_bytes(1000)).unwrap();

    let response = http_get(
        addr,
        &format!("GET /video/{} HTTP/1.1\r\nHost: test\r\nRange: bytes=100-199\r\n\r\n", id),
    );
    assert_eq!(response.status, 206);
    assert_eq!(response.header("content-range"), Some("bytes 100-199/1000"));
    assert_eq!(response.header("content-length"), Some("100"));
    assert_eq!(response.body, video_bytes(1000)[100..200].to_vec());

    shutdown.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_server_bad_request_over_socket() {
    let temp = TempDir::new().unwrap();
    let (addr, shutdown, handle) = start_server(&temp, Arc::new(MemoryStore::new()), 8);

    let response = http_get(addr, "NOT HTTP AT ALL\r\n\r\n");
    assert_eq!(response.status, 400);

    shutdown.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_server_busy_over_socket() {
    let temp = TempDir::new().unwrap();
    let (addr, shutdown, handle) = start_server(&temp, Arc::new(MemoryStore::new()), 1);

    // Holds the only slot: connected but silent until its read deadline
    let _idle = TcpStream::connect(addr).unwrap();
    thread::sleep(Duration::from_millis(200));

    // Rejected at accept time, before any request is read
    let mut rejected = TcpStream::connect(addr).unwrap();
    rejected.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut raw = Vec::new();
    rejected.read_to_end(&mut raw).unwrap();
    let response = RawResponse::parse(&raw);
    assert_eq!(response.status, 503);
    assert_eq!(response.header("connection"), Some("close"));

    shutdown.shutdown();
    handle.join().unwrap();
}
