//! Transfer Module
//!
//! Binary file transfer over the line protocol.
//!
//! ## Responsibilities
//! - Read exactly a declared number of bytes, chunk by chunk, straight to disk
//! - Derive collision-resistant stored names from untrusted file names
//! - Drive the upload sequence (`OK` → raw bytes → `DONE`)
//! - Stream stored files back (`OK|size` → raw bytes)
//!
//! ## Upload Sequence
//! ```text
//! AWAIT_HEADER ──size ok──▶ ACK_SENT ──▶ RECEIVING ──all bytes──▶ COMPLETE
//!      │                                     │
//!      └──bad size──▶ FAILED ◀──short read───┘
//! ```

mod reader;
mod naming;
mod upload;
mod download;

pub use reader::{copy_exact, MAX_CHUNK_SIZE};
pub use naming::{resolve_stored_file, sanitize_component, sanitize_file_name, stored_file_name};
pub use upload::{parse_declared_size, StoredFile, TransferHeader, Upload, UploadState};
pub use download::send_stored_file;

/// Size limits shared by every transfer
#[derive(Debug, Clone, Copy)]
pub struct TransferLimits {
    /// Largest declared upload size accepted
    pub max_upload_bytes: u64,

    /// Bytes moved per read/write call
    pub chunk_size: usize,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024, // 50 MB
            chunk_size: MAX_CHUNK_SIZE,
        }
    }
}
