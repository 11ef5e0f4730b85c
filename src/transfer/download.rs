//! Download sequence
//!
//! Streams a whole stored file: `OK|size` followed by exactly `size` bytes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{LmsError, Result};
use crate::protocol::{write_frame, Frame};

use super::naming::resolve_stored_file;
use super::reader::copy_exact;

/// Send the stored file named by `reference` from `root`.
///
/// Fails with `NotFound` before anything is written when the reference does
/// not name an existing file. Once the `OK|size` header is out, failures come
/// back as `Transfer`; the header cannot be taken back.
pub fn send_stored_file<W: Write + ?Sized>(
    writer: &mut W,
    root: &Path,
    reference: &str,
    chunk_size: usize,
) -> Result<u64> {
    let path = resolve_stored_file(root, reference)
        .ok_or_else(|| LmsError::NotFound(reference.to_string()))?;

    let mut file = match File::open(&path) {
        Ok(file) => file,
        Err(_) => return Err(LmsError::NotFound(path.display().to_string())),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        return Err(LmsError::NotFound(path.display().to_string()));
    }
    let size = metadata.len();

    write_frame(writer, &Frame::ok_with([size.to_string()]))?;

    let sent = copy_exact(&mut file, writer, size, chunk_size)
        .and_then(|sent| writer.flush().map(|_| sent).map_err(LmsError::from))
        .map_err(|e| LmsError::Transfer(format!("{}: {}", path.display(), e)))?;

    tracing::debug!(path = %path.display(), bytes = sent, "Download complete");
    Ok(sent)
}
