//! Byte ranges
//!
//! Parses a single `Range: bytes=start-end` header against a known file
//! length. Only the `bytes` unit and one range per request are supported.

use crate::error::{LmsError, Result};

/// An inclusive slice `[start, end]` of a file of `total` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl ByteRange {
    /// The range covering the whole file; `None` for an empty file
    pub fn full(total: u64) -> Option<Self> {
        (total > 0).then(|| Self {
            start: 0,
            end: total - 1,
            total,
        })
    }

    /// Number of bytes in the slice
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// `Content-Range` value, e.g. `bytes 100-199/1000`
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// `Content-Range` value for a 416 answer
pub fn unsatisfied_range(total: u64) -> String {
    format!("bytes */{}", total)
}

/// Resolve a `Range` header value against a file of `total` bytes
///
/// An empty start means 0 and an empty end means the last byte; an end past
/// the file is clamped. Anything else that cannot be served as one slice is
/// an `InvalidRange`.
pub fn parse_range_header(value: &str, total: u64) -> Result<ByteRange> {
    let range_set = value
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| LmsError::InvalidRange(format!("unsupported unit in {:?}", value)))?;

    if range_set.contains(',') {
        return Err(LmsError::InvalidRange(format!("multiple ranges in {:?}", value)));
    }

    let (raw_start, raw_end) = range_set
        .split_once('-')
        .ok_or_else(|| LmsError::InvalidRange(format!("missing '-' in {:?}", value)))?;

    if total == 0 {
        return Err(LmsError::InvalidRange("empty file".to_string()));
    }
    let last = total - 1;

    let start = parse_bound(raw_start, 0)?;
    let end = parse_bound(raw_end, last)?.min(last);

    if start > end {
        return Err(LmsError::InvalidRange(format!(
            "{}-{} outside of {} bytes",
            start, end, total
        )));
    }

    Ok(ByteRange { start, end, total })
}

fn parse_bound(raw: &str, default: u64) -> Result<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LmsError::InvalidRange(format!("non-numeric bound {:?}", raw)));
    }
    raw.parse::<u64>()
        .map_err(|_| LmsError::InvalidRange(format!("bound out of range {:?}", raw)))
}
