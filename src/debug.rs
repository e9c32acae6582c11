//! Optional render tracing: a single toggleable struct threaded explicitly
//! through the hot path, writing to a caller-supplied writer instead of a
//! hardcoded stream.

use std::io;

use crate::error::Result;
use crate::ir::Op;

/// Receives a trace of opcode dispatch and provider calls during `apply_traced`.
/// All methods have default implementations in terms of `trace`, so a custom
/// tracer usually only needs to override the events it cares about.
pub trait Tracer {
    fn trace(&mut self, message: &str);

    fn apply_start(&mut self, template_name: Option<&str>) {
        match template_name {
            Some(name) => self.trace(&format!("apply start: template {name:?}")),
            None => self.trace("apply start"),
        }
    }

    fn apply_end(&mut self, result: &Result<()>) {
        match result {
            Ok(()) => self.trace("apply end: ok"),
            Err(e) => self.trace(&format!("apply end: error: {e}")),
        }
    }

    fn dispatch(&mut self, pc: u32, op: Op) {
        self.trace(&format!("pc={pc} {op:?}"));
    }

    fn provider_get(&mut self, name: &str, found: bool) {
        self.trace(&format!("get {name:?} -> {}", if found { "some" } else { "none" }));
    }

    fn provider_enter(&mut self, name: &str, entered: bool) {
        self.trace(&format!("enter {name:?} -> {entered}"));
    }

    fn provider_next(&mut self, has_more: bool) {
        self.trace(&format!("next -> {has_more}"));
    }

    fn provider_leave(&mut self) {
        self.trace("leave");
    }

    fn partial_resolved(&mut self, name: &str, found: bool) {
        self.trace(&format!("partial {name:?} -> {}", if found { "found" } else { "missing" }));
    }
}

/// A tracer that discards every event. Used as the default when no tracing
/// is requested, so the traced and untraced code paths stay identical.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTracer;

impl Tracer for NullTracer {
    fn trace(&mut self, _message: &str) {}
}

/// Writes each event as one line to any [`std::io::Write`] implementor.
pub struct WriterTracer<W: io::Write> {
    enabled: bool,
    writer: W,
}

impl<W: io::Write> WriterTracer<W> {
    pub fn new(writer: W, enabled: bool) -> Self {
        WriterTracer { enabled, writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Tracer for WriterTracer<W> {
    fn trace(&mut self, message: &str) {
        if !self.enabled {
            return;
        }
        let _ = writeln!(self.writer, "TRACE: {message}");
    }
}
