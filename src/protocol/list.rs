//! List responses
//!
//! Every listing command answers with one `TAG|field|...` line per row and a
//! closing `END` line. This is the only place that shape is produced.

use std::io::Write;

use crate::error::Result;

use super::header::{DELIMITER, TERMINATOR};

/// Sentinel line closing every list response
pub const END_LINE: &str = "END";

/// Render rows into a complete list response.
///
/// `to_fields` maps a row onto its display fields in wire order; `None`
/// renders as an empty field. Line breaks inside a field are replaced with
/// spaces so a row never spans more than one line.
pub fn render_list<T, I, F>(tag: &str, rows: I, to_fields: F) -> String
where
    I: IntoIterator<Item = T>,
    F: Fn(T) -> Vec<Option<String>>,
{
    let mut out = String::new();

    for row in rows {
        out.push_str(tag);
        for field in to_fields(row) {
            out.push(DELIMITER);
            if let Some(value) = field {
                push_single_line(&mut out, &value);
            }
        }
        out.push(TERMINATOR as char);
    }

    out.push_str(END_LINE);
    out.push(TERMINATOR as char);
    out
}

/// Render and write a list response in one write, returning the row count
pub fn write_list<W, T, F>(writer: &mut W, tag: &str, rows: Vec<T>, to_fields: F) -> Result<usize>
where
    W: Write + ?Sized,
    F: Fn(T) -> Vec<Option<String>>,
{
    let count = rows.len();
    let body = render_list(tag, rows, to_fields);
    writer.write_all(body.as_bytes())?;
    writer.flush()?;
    Ok(count)
}

fn push_single_line(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '\r' | '\n' => out.push(' '),
            other => out.push(other),
        }
    }
}
