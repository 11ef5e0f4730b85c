//! Command Module
//!
//! Routes parsed requests to their handlers.
//!
//! ## Responsibilities
//! - Hold the verb → handler table with each verb's arity
//! - Reject unknown verbs and arity mismatches before handler code runs
//! - Implement every LMS verb on top of the store and transfer layers

mod context;
mod registry;
mod handlers;

pub use context::Services;
pub use registry::{CommandRegistry, Exchange, Handler};
