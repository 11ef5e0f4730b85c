//! HTTP/1.1 response writer
//!
//! Just enough of HTTP for a streaming file server: a status line, a flat
//! header list and an optional file slice as the body.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use crate::error::Result;
use crate::transfer::copy_exact;

/// Media type of every served resource
pub const CONTENT_TYPE: &str = "video/mp4";

/// Response body
#[derive(Debug)]
pub enum Body {
    Empty,
    /// `len` bytes of `file` starting at `offset`
    File { file: File, offset: u64, len: u64 },
}

/// A response ready to be written
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(&'static str, String)>,
    content_length: u64,
    body: Body,
}

impl Response {
    /// Response with the headers every answer carries and no body
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: vec![
                ("Content-Type", CONTENT_TYPE.to_string()),
                ("Accept-Ranges", "bytes".to_string()),
                ("Connection", "close".to_string()),
            ],
            content_length: 0,
            body: Body::Empty,
        }
    }

    /// Append a header
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Advertise a length without sending a body (HEAD)
    pub fn content_length(mut self, len: u64) -> Self {
        self.content_length = len;
        self
    }

    /// Send `len` bytes of `file` starting at `offset`
    pub fn file_body(mut self, file: File, offset: u64, len: u64) -> Self {
        self.content_length = len;
        self.body = Body::File { file, offset, len };
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Value of the first header named `name`, ignoring case
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Write head and body; returns the number of body bytes sent
    pub fn write_to<W: Write + ?Sized>(self, writer: &mut W, chunk_size: usize) -> Result<u64> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status));
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", self.content_length));
        writer.write_all(head.as_bytes())?;

        let sent = match self.body {
            Body::Empty => 0,
            Body::File {
                mut file,
                offset,
                len,
            } => {
                file.seek(SeekFrom::Start(offset))?;
                copy_exact(&mut file, writer, len, chunk_size)?
            }
        };

        writer.flush()?;
        Ok(sent)
    }
}

/// Reason phrase for the statuses this server produces
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        206 => "Partial Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        416 => "Range Not Satisfiable",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
