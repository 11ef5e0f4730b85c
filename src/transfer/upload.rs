//! Upload sequence
//!
//! Receives a declared-length payload into a freshly named file, records it
//! through a caller-supplied callback and acknowledges with `DONE`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{LmsError, Result};
use crate::protocol::{write_frame, Frame};

use super::naming::{sanitize_file_name, stored_file_name};
use super::reader::copy_exact;
use super::TransferLimits;

/// Where an upload is in its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    AwaitHeader,
    AckSent,
    Receiving,
    Complete,
    Failed,
}

/// The upload fields of a header line: `VERB|user|resource|filename|size`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferHeader {
    pub user_id: String,
    pub resource_id: String,
    pub file_name: String,
    pub declared_size: String,
}

impl TransferHeader {
    /// Take the four upload fields in wire order
    pub fn from_fields(fields: &[String]) -> Result<Self> {
        match fields {
            [user_id, resource_id, file_name, declared_size] => Ok(Self {
                user_id: user_id.clone(),
                resource_id: resource_id.clone(),
                file_name: file_name.clone(),
                declared_size: declared_size.clone(),
            }),
            _ => Err(LmsError::BadRequest(format!(
                "upload header needs 4 fields, got {}",
                fields.len()
            ))),
        }
    }
}

/// A file written by a successful receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Name under the transfer root (the stored file reference)
    pub stored_name: String,

    /// Full path on disk
    pub path: PathBuf,

    /// Sanitized form of the client's file name
    pub client_name: String,

    /// Bytes written, always equal to the declared size
    pub size: u64,
}

/// Parse a declared length, enforcing the upload cap
pub fn parse_declared_size(raw: &str, limit: u64) -> Result<u64> {
    let size: u64 = raw
        .trim()
        .parse()
        .map_err(|_| LmsError::BadFileSize(raw.to_string()))?;

    if size > limit {
        return Err(LmsError::InvalidSize { size, limit });
    }

    Ok(size)
}

/// One upload, driven from header to `DONE`
pub struct Upload {
    header: TransferHeader,
    root: PathBuf,
    limits: TransferLimits,
    state: UploadState,
}

impl Upload {
    pub fn new(header: TransferHeader, root: impl Into<PathBuf>, limits: TransferLimits) -> Self {
        Self {
            header,
            root: root.into(),
            limits,
            state: UploadState::AwaitHeader,
        }
    }

    /// Current state
    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Run the whole sequence.
    ///
    /// Steps:
    /// 1. Validate the declared size (no I/O on failure)
    /// 2. Send `OK`
    /// 3. Receive exactly the declared bytes into a new file
    /// 4. Call `record` with the stored file, then send `DONE`
    ///
    /// A failed receive removes the partial file. A failed `record` leaves
    /// the file in place. Error frames are left to the caller.
    pub fn run<R, W, F>(&mut self, reader: &mut R, writer: &mut W, record: F) -> Result<StoredFile>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
        F: FnOnce(&StoredFile) -> Result<()>,
    {
        // Step 1: Declared size
        let size = match parse_declared_size(&self.header.declared_size, self.limits.max_upload_bytes) {
            Ok(size) => size,
            Err(e) => return self.fail(e),
        };

        tracing::debug!(
            user = %self.header.user_id,
            resource = %self.header.resource_id,
            file = %self.header.file_name,
            size,
            "Upload header accepted"
        );

        // Step 2: Acknowledge
        if let Err(e) = write_frame(writer, &Frame::ok()) {
            return self.fail(e);
        }
        self.state = UploadState::AckSent;

        // Step 3: Receive
        self.state = UploadState::Receiving;
        let stored = match self.receive(reader, size) {
            Ok(stored) => stored,
            Err(e) => return self.fail(e),
        };

        // Step 4: Record, then acknowledge
        if let Err(e) = record(&stored) {
            tracing::warn!(path = %stored.path.display(), "Upload stored but not recorded");
            return self.fail(e);
        }

        self.state = UploadState::Complete;
        if let Err(e) = write_frame(writer, &Frame::Done) {
            tracing::debug!(error = %e, "Peer gone before DONE");
        }

        tracing::info!(
            user = %self.header.user_id,
            resource = %self.header.resource_id,
            path = %stored.path.display(),
            size = stored.size,
            "Upload complete"
        );

        Ok(stored)
    }

    fn receive<R: Read + ?Sized>(&self, reader: &mut R, size: u64) -> Result<StoredFile> {
        fs::create_dir_all(&self.root)
            .map_err(|e| LmsError::Receive(format!("cannot create {}: {}", self.root.display(), e)))?;

        let stored_name = stored_file_name(
            &self.header.resource_id,
            &self.header.user_id,
            &self.header.file_name,
            Local::now(),
        );
        let path = self.root.join(&stored_name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| LmsError::Receive(format!("cannot create {}: {}", path.display(), e)))?;

        match write_payload(reader, file, size, self.limits.chunk_size) {
            Ok(written) => Ok(StoredFile {
                stored_name,
                path,
                client_name: sanitize_file_name(&self.header.file_name),
                size: written,
            }),
            Err(e) => {
                remove_partial(&path);
                Err(e)
            }
        }
    }

    fn fail<T>(&mut self, error: LmsError) -> Result<T> {
        self.state = UploadState::Failed;
        Err(error)
    }
}

fn write_payload<R: Read + ?Sized>(reader: &mut R, file: File, size: u64, chunk_size: usize) -> Result<u64> {
    let mut sink = BufWriter::with_capacity(chunk_size.max(1), file);

    let written = copy_exact(reader, &mut sink, size, chunk_size).map_err(|e| match e {
        LmsError::Io(io) => LmsError::Receive(io.to_string()),
        other => other,
    })?;

    let file = sink
        .into_inner()
        .map_err(|e| LmsError::Receive(e.error().to_string()))?;
    file.sync_all()
        .map_err(|e| LmsError::Receive(e.to_string()))?;

    Ok(written)
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial upload"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial upload"),
    }
}
