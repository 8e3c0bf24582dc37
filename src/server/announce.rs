//! One-line JSON status messages for the host process.
//!
//! The host scans stdout for the readiness line by substring, so lines are
//! rendered with a space after every `:` and `,` (for example
//! `{"status": "ready", "port": 5678, ...}`) rather than in compact form.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::Formatter;

/// Readiness message written to stdout once the listener is bound.
pub const READY_MESSAGE: &str = "Fish Audio TTS Server started (task-per-connection mode)";

/// Message written to stderr after the server has drained.
pub const STOPPED_MESSAGE: &str = "Fish Audio TTS Server stopped";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusLine<'a> {
    Ready { port: u16, message: &'a str },
    Stopped { message: &'a str },
    Error { error: &'a str },
}

impl StatusLine<'_> {
    pub fn render(&self) -> String {
        let mut out = Vec::with_capacity(96);
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
        match self.serialize(&mut serializer) {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(e) => format!("{{\"status\": \"error\", \"error\": \"{e}\"}}"),
        }
    }
}

/// Print the readiness line to stdout and flush it.
pub fn ready(port: u16) {
    let line = StatusLine::Ready {
        port,
        message: READY_MESSAGE,
    }
    .render();
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{line}");
    let _ = stdout.flush();
}

/// Print the stopped line to stderr.
pub fn stopped() {
    eprintln!(
        "{}",
        StatusLine::Stopped {
            message: STOPPED_MESSAGE
        }
        .render()
    );
}

/// Print a fatal startup error to stderr.
pub fn error(message: &str) {
    eprintln!("{}", StatusLine::Error { error: message }.render());
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_line_format() {
        let line = StatusLine::Ready {
            port: 5678,
            message: READY_MESSAGE,
        }
        .render();
        assert_eq!(
            line,
            r#"{"status": "ready", "port": 5678, "message": "Fish Audio TTS Server started (task-per-connection mode)"}"#
        );
        assert!(line.contains(r#""status": "ready""#));
    }

    #[test]
    fn test_stopped_and_error_lines() {
        assert_eq!(
            StatusLine::Stopped {
                message: STOPPED_MESSAGE
            }
            .render(),
            r#"{"status": "stopped", "message": "Fish Audio TTS Server stopped"}"#
        );
        assert_eq!(
            StatusLine::Error {
                error: "Invalid port number: abc"
            }
            .render(),
            r#"{"status": "error", "error": "Invalid port number: abc"}"#
        );
    }

    #[test]
    fn test_lines_are_valid_json() {
        let line = StatusLine::Error {
            error: "quote \" and, comma: colon",
        }
        .render();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["error"], "quote \" and, comma: colon");
    }
}
