//! Header line parsing
//!
//! Reads one terminator-delimited line from a buffered stream and splits it
//! into a verb plus ordered fields.

use std::io::{BufRead, ErrorKind};

use bytes::{BufMut, BytesMut};

use crate::error::{LmsError, Result};

/// Byte that ends every header line and response frame
pub const TERMINATOR: u8 = b'\n';

/// Separator between the verb and each field
pub const DELIMITER: char = '|';

/// Initial capacity for the line buffer; most headers are short
const INITIAL_LINE_CAPACITY: usize = 256;

// =============================================================================
// Line Reading
// =============================================================================

/// Read one line, stopping right after the terminator.
///
/// Bytes that follow the terminator stay in `reader`, so a raw payload sent
/// immediately after the header is not lost. Returns `Ok(None)` when the
/// stream ends before a terminator arrives. A line longer than `max_len`
/// bytes (terminator excluded) fails with `HeaderTooLong`.
///
/// A trailing `\r` is stripped and invalid UTF-8 is replaced, not rejected.
pub fn read_line<R: BufRead + ?Sized>(reader: &mut R, max_len: usize) -> Result<Option<String>> {
    let mut line = BytesMut::with_capacity(INITIAL_LINE_CAPACITY.min(max_len.saturating_add(1)));

    loop {
        let available = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        if available.is_empty() {
            if !line.is_empty() {
                tracing::debug!(bytes = line.len(), "Stream ended before header terminator");
            }
            return Ok(None);
        }

        let (content_len, consumed, found) =
            match available.iter().position(|&b| b == TERMINATOR) {
                Some(pos) => (pos, pos + 1, true),
                None => (available.len(), available.len(), false),
            };

        if line.len() + content_len > max_len {
            return Err(LmsError::HeaderTooLong { limit: max_len });
        }

        line.put_slice(&available[..content_len]);
        reader.consume(consumed);

        if found {
            break;
        }
    }

    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }

    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

// =============================================================================
// Request
// =============================================================================

/// A parsed header line: verb plus ordered fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub verb: String,
    pub fields: Vec<String>,
}

impl Request {
    /// Split a header line on the delimiter
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split(DELIMITER);
        let verb = parts.next().unwrap_or_default().to_string();
        let fields = parts.map(str::to_string).collect();
        Self { verb, fields }
    }

    /// Build a request from a verb and fields
    pub fn new<I, S>(verb: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verb: verb.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Render back into a header line, terminator included
    pub fn to_line(&self) -> String {
        let mut line = self.verb.clone();
        for field in &self.fields {
            line.push(DELIMITER);
            line.push_str(field);
        }
        line.push(TERMINATOR as char);
        line
    }
}

/// Number of fields a verb accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many fields
    Exact(usize),

    /// At least this many; the last field absorbs any extra `|`-separated text
    AtLeast(usize),
}

impl Arity {
    /// Check a field count against this arity
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}
