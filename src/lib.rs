//! # LMS Server
//!
//! Learning-management backend exposed over two transports:
//! - A line-delimited command protocol with length-prefixed binary uploads
//!   and downloads
//! - An HTTP server streaming lecture videos with byte-range support
//! - Bounded, per-connection worker threads with socket deadlines
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │        Line Server           │   │        Video Server          │
//! │   (one request/connection)   │   │     (HTTP, Range: bytes)     │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                │                                  │
//! ┌──────────────▼───────────────┐                  │
//! │       Command Registry       │                  │
//! │   (verb → handler, arity)    │                  │
//! └───────┬──────────────┬───────┘                  │
//!         │              │                          │
//!         ▼              ▼                          ▼
//!  ┌─────────────┐ ┌──────────────────────────────────────┐
//!  │  Transfer   │ │            Metadata Store            │
//!  │ (exact-N IO)│ │ (trait; in-memory implementation)    │
//!  └──────┬──────┘ └──────────────────────────────────────┘
//!         │
//!         ▼
//!  ┌─────────────────────────────┐
//!  │  data_dir/{submissions,     │
//!  │           videos}/          │
//!  └─────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transfer;
pub mod store;
pub mod command;
pub mod network;
pub mod http;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LmsError, Result};
pub use config::Config;
pub use command::{CommandRegistry, Services};
pub use network::{LineServer, ShutdownHandle};
pub use http::VideoServer;
pub use store::{MemoryStore, MetadataStore};
pub use client::LmsClient;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the LMS server
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
