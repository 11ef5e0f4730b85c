//! Protocol Module
//!
//! Defines the line protocol spoken between clients and the command server.
//!
//! ## Request Format
//! ```text
//! ┌──────────┬───┬──────────┬───┬─────┬───┬──────────┬────┐
//! │   VERB   │ | │ field 1  │ | │ ... │ | │ field N  │ \n │
//! └──────────┴───┴──────────┴───┴─────┴───┴──────────┴────┘
//! ```
//!
//! Upload verbs (`ASSIGN_SUBMIT_FILE`, `VIDEO_UPLOAD_FILE`) declare a byte
//! length in their last field. After the server answers `OK`, exactly that
//! many raw bytes follow the header line on the same connection.
//!
//! ## Response Frames
//! - `OK[|field...]`  - success, optionally carrying fields
//! - `DONE`           - upload stored and recorded
//! - `ERR|CODE`       - failure, CODE from a closed set
//! - `TAG|field...`   - one row of a list response
//! - `END`            - list terminator, always sent (even for zero rows)
//!
//! `ASSIGN_DOWNLOAD_FILE` answers `OK|size` followed by `size` raw bytes.

mod header;
mod frame;
mod list;

pub use header::{read_line, Arity, Request, DELIMITER, TERMINATOR};
pub use frame::{write_frame, ErrorCode, Frame};
pub use list::{render_list, write_list, END_LINE};
