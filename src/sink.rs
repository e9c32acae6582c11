//! The write-callback interface rendered output streams through, plus two
//! ready-made sinks: one for building a `String` in memory, one for
//! streaming straight to any `io::Write`.

use std::io;

use crate::error::{Error, Result};

/// Receives already-escaped (or deliberately raw) bytes from the applier.
/// HTML-escaping itself happens in [`crate::applier`] before bytes reach
/// here, so a sink only ever needs to move bytes — no escaping hook to
/// implement.
pub trait Sink {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Renders into an in-memory `String`.
pub struct StringSink<'a> {
    buf: &'a mut String,
}

impl<'a> StringSink<'a> {
    pub fn new(buf: &'a mut String) -> Self {
        StringSink { buf }
    }
}

impl Sink for StringSink<'_> {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                self.buf.push_str(s);
                Ok(())
            }
            Err(e) => Err(Error::System(e.to_string())),
        }
    }
}

/// Renders into any [`std::io::Write`] implementor (a file, a socket, a
/// `Vec<u8>`, ...).
pub struct WriteSink<W: io::Write> {
    writer: W,
}

impl<W: io::Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        WriteSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Sink for WriteSink<W> {
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).map_err(|e| Error::System(e.to_string()))
    }
}
