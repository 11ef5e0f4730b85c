//! Byte-length reader
//!
//! Moves exactly N bytes from a source to a sink in bounded chunks.

use std::io::{ErrorKind, Read, Write};

use crate::error::{LmsError, Result};

/// Upper bound on a single read, regardless of the requested chunk size
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

/// Copy exactly `len` bytes from `source` to `sink`.
///
/// Each chunk is written to the sink as soon as it is read; at most
/// `min(chunk_size, MAX_CHUNK_SIZE)` bytes are held in memory. A read that
/// returns zero bytes before `len` bytes have arrived fails with
/// `PrematureEof`, reporting how far the copy got.
pub fn copy_exact<R, W>(source: &mut R, sink: &mut W, len: u64, chunk_size: usize) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let chunk = chunk_size.clamp(1, MAX_CHUNK_SIZE);
    let buf_len = usize::try_from(len).map_or(chunk, |l| l.min(chunk));
    let mut buf = vec![0u8; buf_len];
    let mut received: u64 = 0;

    while received < len {
        let want = usize::try_from(len - received).map_or(buf.len(), |r| r.min(buf.len()));

        let n = match source.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(LmsError::PrematureEof {
                    received,
                    expected: len,
                })
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        sink.write_all(&buf[..n])?;
        received += n as u64;
    }

    Ok(received)
}
