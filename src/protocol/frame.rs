//! Response frames
//!
//! Every frame is a single `|`-delimited text line.

use std::fmt;
use std::io::Write;

use crate::error::Result;

use super::header::{DELIMITER, TERMINATOR};

/// Closed set of error codes sent in `ERR|CODE` frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadRequest,
    BadFileSize,
    InvalidSize,
    FileRecvError,
    TransferError,
    NotFound,
    DbError,
    ServerError,
    UnknownCommand,
    InvalidCredentials,
    ServerBusy,
}

impl ErrorCode {
    /// Wire spelling of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::BadFileSize => "BAD_FILESIZE",
            ErrorCode::InvalidSize => "INVALID_SIZE",
            ErrorCode::FileRecvError => "FILE_RECV_ERROR",
            ErrorCode::TransferError => "TRANSFER_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DbError => "DB_ERROR",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::ServerBusy => "SERVER_BUSY",
        }
    }

    /// Parse a wire code
    pub fn parse(code: &str) -> Option<Self> {
        let code = match code {
            "BAD_REQUEST" => ErrorCode::BadRequest,
            "BAD_FILESIZE" => ErrorCode::BadFileSize,
            "INVALID_SIZE" => ErrorCode::InvalidSize,
            "FILE_RECV_ERROR" => ErrorCode::FileRecvError,
            "TRANSFER_ERROR" => ErrorCode::TransferError,
            "NOT_FOUND" => ErrorCode::NotFound,
            "DB_ERROR" => ErrorCode::DbError,
            "SERVER_ERROR" => ErrorCode::ServerError,
            "UNKNOWN_COMMAND" => ErrorCode::UnknownCommand,
            "INVALID_CREDENTIALS" => ErrorCode::InvalidCredentials,
            "SERVER_BUSY" => ErrorCode::ServerBusy,
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `OK` or `OK|field|...`
    Ok(Vec<String>),

    /// `DONE`, terminal frame of a successful upload
    Done,

    /// `ERR|CODE`
    Error(ErrorCode),
}

impl Frame {
    /// Plain `OK`
    pub fn ok() -> Self {
        Frame::Ok(Vec::new())
    }

    /// `OK` carrying fields
    pub fn ok_with<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Frame::Ok(fields.into_iter().map(Into::into).collect())
    }

    /// Encode to a terminated line
    pub fn encode(&self) -> String {
        let mut line = match self {
            Frame::Ok(fields) => {
                let mut line = String::from("OK");
                for field in fields {
                    line.push(DELIMITER);
                    line.push_str(field);
                }
                line
            }
            Frame::Done => String::from("DONE"),
            Frame::Error(code) => format!("ERR{}{}", DELIMITER, code),
        };
        line.push(TERMINATOR as char);
        line
    }

    /// Decode a line received from the server (terminator already stripped)
    ///
    /// Returns `None` for lines that are not status frames (list rows, `END`).
    pub fn decode(line: &str) -> Option<Self> {
        let mut parts = line.split(DELIMITER);
        match parts.next()? {
            "OK" => Some(Frame::Ok(parts.map(str::to_string).collect())),
            "DONE" => Some(Frame::Done),
            "ERR" => {
                let code = parts.next().and_then(ErrorCode::parse)?;
                Some(Frame::Error(code))
            }
            _ => None,
        }
    }
}

/// Write a frame and flush it
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, frame: &Frame) -> Result<()> {
    writer.write_all(frame.encode().as_bytes())?;
    writer.flush()?;
    Ok(())
}
