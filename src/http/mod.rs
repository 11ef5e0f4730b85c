//! HTTP Module
//!
//! Streams stored lecture videos with byte-range support.
//!
//! ## Responsibilities
//! - Parse request heads (httparse) under a size cap
//! - Resolve `/video/{id}` through the metadata store
//! - Answer whole-file (200), partial (206) and unsatisfiable (416) requests

mod range;
mod response;
mod server;

pub use range::{parse_range_header, unsatisfied_range, ByteRange};
pub use response::{reason_phrase, Body, Response, CONTENT_TYPE};
pub use server::{read_request_head, RequestHead, VideoServer, VideoService};
