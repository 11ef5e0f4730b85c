//! Blocking line-protocol client
//!
//! Opens one connection per request, mirroring the server's
//! one-request-per-connection discipline.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;

use crate::error::{LmsError, Result};
use crate::protocol::{read_line, Frame, Request, DELIMITER};
use crate::transfer::{copy_exact, MAX_CHUNK_SIZE};

/// Longest reply line the client accepts
const MAX_REPLY_LINE: usize = 64 * 1024;

/// Line ending every listing
const END_MARKER: &str = "END";

/// Successful `LOGIN` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub role: String,
    pub display_name: String,
}

/// One listing row, fields in wire order (tag excluded)
pub type Row = Vec<String>;

/// Client for the LMS line protocol
#[derive(Debug, Clone)]
pub struct LmsClient {
    addr: String,
    timeout: Option<Duration>,
}

struct Conn {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl LmsClient {
    /// Client for the server at `addr` (host:port)
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Socket read/write deadline; `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    // =========================================================================
    // Accounts and chat
    // =========================================================================

    pub fn login(&self, user_id: &str, password: &str) -> Result<Session> {
        let fields = self.call("LOGIN", [user_id, password])?;
        match fields.as_slice() {
            [role, display_name, ..] => Ok(Session {
                role: role.clone(),
                display_name: display_name.clone(),
            }),
            _ => Err(LmsError::UnexpectedReply(format!("OK|{}", fields.join("|")))),
        }
    }

    pub fn list_students(&self, user_id: &str) -> Result<Vec<Row>> {
        self.list("STUDENT_LIST", [user_id], "STUDENT", 3)
    }

    pub fn post_chat(&self, from: &str, to: &str, message: &str) -> Result<()> {
        self.call("CHAT_POST", [from, to, message]).map(drop)
    }

    /// Messages between two users in posting order: `[from, to, body]`
    pub fn chat_history(&self, user_a: &str, user_b: &str) -> Result<Vec<Row>> {
        self.list("CHAT_LIST", [user_a, user_b], "MSG", 3)
    }

    // =========================================================================
    // Assignments
    // =========================================================================

    pub fn list_assignments(&self, user_id: &str) -> Result<Vec<Row>> {
        self.list("ASSIGN_LIST", [user_id], "ASSIGN", 4)
    }

    pub fn create_assignment(&self, user_id: &str, title: &str, summary: &str) -> Result<()> {
        self.call_with_tail("ASSIGN_CREATE", [user_id, title], summary)
    }

    pub fn update_assignment(&self, user_id: &str, task_id: &str, title: &str, summary: &str) -> Result<()> {
        self.call_with_tail("ASSIGN_UPDATE", [user_id, task_id, title], summary)
    }

    pub fn delete_assignment(&self, user_id: &str, task_id: &str) -> Result<()> {
        self.call("ASSIGN_DELETE", [user_id, task_id]).map(drop)
    }

    pub fn list_submissions(&self, user_id: &str, task_id: &str) -> Result<Vec<Row>> {
        self.list("ASSIGN_SUBMISSION_LIST", [user_id, task_id], "SUBMIT", 4)
    }

    /// Upload a local file as a submission for `task_id`
    pub fn submit_file(&self, user_id: &str, task_id: &str, path: &Path) -> Result<()> {
        self.upload_path("ASSIGN_SUBMIT_FILE", user_id, task_id, path)
    }

    /// Download a stored submission into `sink`; returns the byte count
    pub fn download_file<W: Write + ?Sized>(&self, user_id: &str, file_path: &str, sink: &mut W) -> Result<u64> {
        let mut conn = self.send(&request("ASSIGN_DOWNLOAD_FILE", [user_id, file_path]))?;
        let fields = expect_ok(&mut conn)?;
        let size = fields
            .first()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| LmsError::UnexpectedReply(format!("OK|{}", fields.join("|"))))?;

        let received = copy_exact(&mut conn.reader, sink, size, MAX_CHUNK_SIZE)?;
        sink.flush()?;
        Ok(received)
    }

    // =========================================================================
    // Notices
    // =========================================================================

    pub fn list_notices(&self, user_id: &str) -> Result<Vec<Row>> {
        self.list("NOTICE_LIST", [user_id], "NOTICE", 4)
    }

    pub fn create_notice(&self, user_id: &str, content: &str) -> Result<()> {
        self.call("NOTICE_CREATE", [user_id, content]).map(drop)
    }

    pub fn update_notice(&self, user_id: &str, notice_id: &str, content: &str) -> Result<()> {
        self.call("NOTICE_UPDATE", [user_id, notice_id, content]).map(drop)
    }

    pub fn delete_notice(&self, user_id: &str, notice_id: &str) -> Result<()> {
        self.call("NOTICE_DELETE", [user_id, notice_id]).map(drop)
    }

    // =========================================================================
    // Videos
    // =========================================================================

    pub fn list_videos(&self, user_id: &str) -> Result<Vec<Row>> {
        self.list("VIDEO_LIST", [user_id], "VIDEO", 4)
    }

    pub fn watch_video(&self, student_id: &str, video_id: &str) -> Result<()> {
        self.call("VIDEO_WATCH", [student_id, video_id]).map(drop)
    }

    pub fn create_video(&self, user_id: &str, week_id: &str, file_name: &str) -> Result<()> {
        self.call("VIDEO_CREATE", [user_id, week_id, file_name]).map(drop)
    }

    pub fn delete_video(&self, user_id: &str, video_id: &str) -> Result<()> {
        self.call("VIDEO_DELETE", [user_id, video_id]).map(drop)
    }

    pub fn list_progress(&self, user_id: &str, video_id: &str) -> Result<Vec<Row>> {
        self.list("VIDEO_PROGRESS_LIST", [user_id, video_id], "PROG", 4)
    }

    /// Upload a local video file for `week_id`
    pub fn upload_video(&self, user_id: &str, week_id: &str, path: &Path) -> Result<()> {
        self.upload_path("VIDEO_UPLOAD_FILE", user_id, week_id, path)
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Run an upload verb with an in-memory payload
    pub fn upload_bytes(&self, verb: &str, user_id: &str, resource_id: &str, file_name: &str, data: &[u8]) -> Result<()> {
        let mut source = data;
        self.upload_from(verb, user_id, resource_id, file_name, data.len() as u64, &mut source)
    }

    /// Run an upload verb streaming `size` bytes from `source`
    ///
    /// Sends the header, waits for `OK`, streams the payload and waits for
    /// `DONE`. An `ERR|*` at either point is returned as `Remote`.
    pub fn upload_from<R: Read + ?Sized>(
        &self,
        verb: &str,
        user_id: &str,
        resource_id: &str,
        file_name: &str,
        size: u64,
        source: &mut R,
    ) -> Result<()> {
        let size_field = size.to_string();
        let mut conn = self.send(&request(verb, [user_id, resource_id, file_name, size_field.as_str()]))?;
        expect_ok(&mut conn)?;

        copy_exact(source, &mut conn.writer, size, MAX_CHUNK_SIZE)?;
        conn.writer.flush()?;

        match read_frame(&mut conn)? {
            Frame::Done => Ok(()),
            Frame::Error(code) => Err(LmsError::Remote(code.to_string())),
            other => Err(LmsError::UnexpectedReply(other.encode().trim_end().to_string())),
        }
    }

    fn upload_path(&self, verb: &str, user_id: &str, resource_id: &str, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| LmsError::BadRequest(format!("{} has no file name", path.display())))?;
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();
        self.upload_from(verb, user_id, resource_id, &file_name, size, &mut file)
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn connect(&self) -> Result<Conn> {
        let stream = TcpStream::connect(&self.addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        Ok(Conn {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    fn send(&self, request: &Request) -> Result<Conn> {
        let mut conn = self.connect()?;
        conn.writer.write_all(request.to_line().as_bytes())?;
        conn.writer.flush()?;
        Ok(conn)
    }

    /// Single-reply verb; returns the `OK` fields
    fn call<const N: usize>(&self, verb: &str, fields: [&str; N]) -> Result<Vec<String>> {
        let mut conn = self.send(&request(verb, fields))?;
        expect_ok(&mut conn)
    }

    /// Single-reply verb whose last field may contain the delimiter
    fn call_with_tail<const N: usize>(&self, verb: &str, fields: [&str; N], tail: &str) -> Result<()> {
        let mut req = request(verb, fields);
        req.fields.push(single_line(tail));
        let mut conn = self.send(&req)?;
        expect_ok(&mut conn).map(drop)
    }

    /// Listing verb; collects `tag|...` rows until `END`
    ///
    /// Each row is split into at most `columns` fields so a free-text last
    /// column keeps any delimiter it carries.
    fn list<const N: usize>(&self, verb: &str, fields: [&str; N], tag: &str, columns: usize) -> Result<Vec<Row>> {
        let mut conn = self.send(&request(verb, fields))?;
        let prefix = format!("{}{}", tag, DELIMITER);
        let mut rows = Vec::new();

        loop {
            let line = next_line(&mut conn)?;
            if line == END_MARKER {
                return Ok(rows);
            }
            if let Some(rest) = line.strip_prefix(&prefix) {
                rows.push(rest.splitn(columns, DELIMITER).map(str::to_string).collect());
                continue;
            }
            return match Frame::decode(&line) {
                Some(Frame::Error(code)) => Err(LmsError::Remote(code.to_string())),
                _ => Err(LmsError::UnexpectedReply(line)),
            };
        }
    }
}

/// Build a request, flattening fields so they cannot break the framing
fn request<const N: usize>(verb: &str, fields: [&str; N]) -> Request {
    Request::new(
        verb,
        fields
            .iter()
            .map(|f| single_line(f).replace(DELIMITER, "/")),
    )
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn next_line(conn: &mut Conn) -> Result<String> {
    read_line(&mut conn.reader, MAX_REPLY_LINE)?
        .ok_or_else(|| LmsError::UnexpectedReply("connection closed".to_string()))
}

fn read_frame(conn: &mut Conn) -> Result<Frame> {
    let line = next_line(conn)?;
    Frame::decode(&line).ok_or(LmsError::UnexpectedReply(line))
}

fn expect_ok(conn: &mut Conn) -> Result<Vec<String>> {
    match read_frame(conn)? {
        Frame::Ok(fields) => Ok(fields),
        Frame::Error(code) => Err(LmsError::Remote(code.to_string())),
        Frame::Done => Err(LmsError::UnexpectedReply("DONE".to_string())),
    }
}
