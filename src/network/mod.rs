//! Network Module
//!
//! TCP server and client handling for the line protocol.
//!
//! ## Architecture
//! - Single acceptor thread polling a nonblocking listener
//! - One worker thread per connection, capped by a permit limiter
//! - One request per connection, routed through the command registry

mod server;
mod connection;
mod limiter;

pub use server::{LineServer, ShutdownHandle};
pub use connection::Connection;
pub use limiter::{ConnectionLimiter, ConnectionPermit};

pub(crate) use server::serve_connections;
