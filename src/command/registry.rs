//! Command registry
//!
//! Maps verbs to handlers and enforces each verb's arity before any handler
//! code runs.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::error::{LmsError, Result};
use crate::protocol::{Arity, Request};

use super::context::Services;

/// The connection a handler talks to
///
/// `reader` is positioned right after the header line, so a handler that
/// expects a payload reads it from here.
pub struct Exchange<'a> {
    pub reader: &'a mut dyn BufRead,
    pub writer: &'a mut dyn Write,
    pub peer: &'a str,
}

/// A command handler
///
/// Writes zero or more frames to the exchange, possibly after consuming a
/// payload. Errors are turned into an `ERR|CODE` frame by the caller.
pub trait Handler: Send + Sync {
    fn handle(&self, services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()>;
}

impl<F> Handler for F
where
    F: Fn(&Services, &[String], &mut Exchange<'_>) -> Result<()> + Send + Sync,
{
    fn handle(&self, services: &Services, fields: &[String], exchange: &mut Exchange<'_>) -> Result<()> {
        self(services, fields, exchange)
    }
}

struct Registration {
    arity: Arity,
    handler: Box<dyn Handler>,
}

/// Verb → handler table
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Registration>,
}

impl CommandRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the verb
    pub fn register<H>(&mut self, verb: &str, arity: Arity, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.handlers.insert(
            verb.to_string(),
            Registration {
                arity,
                handler: Box::new(handler),
            },
        );
        self
    }

    /// Declared arity of a verb
    pub fn arity(&self, verb: &str) -> Option<Arity> {
        self.handlers.get(verb).map(|r| r.arity)
    }

    /// Whether a verb is registered
    pub fn contains(&self, verb: &str) -> bool {
        self.handlers.contains_key(verb)
    }

    /// Registered verbs, sorted
    pub fn verbs(&self) -> Vec<&str> {
        let mut verbs: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        verbs.sort_unstable();
        verbs
    }

    /// Look up and run the handler for a request
    ///
    /// Fails with `UnknownCommand` for unregistered verbs and `BadRequest`
    /// for arity mismatches; in both cases the handler is never invoked.
    pub fn dispatch(&self, services: &Services, request: &Request, exchange: &mut Exchange<'_>) -> Result<()> {
        let registration = self
            .handlers
            .get(request.verb.as_str())
            .ok_or_else(|| LmsError::UnknownCommand(request.verb.clone()))?;

        if !registration.arity.accepts(request.fields.len()) {
            return Err(LmsError::BadRequest(format!(
                "{} expects {:?} fields, got {}",
                request.verb,
                registration.arity,
                request.fields.len()
            )));
        }

        registration.handler.handle(services, &request.fields, exchange)
    }
}
