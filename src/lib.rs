//! A two-stage Mustache template engine: a compiler that scans a template
//! once into a compact bytecode form, and an applier that interprets that
//! bytecode against a caller-supplied data provider, streaming output to a
//! sink.
//!
//! ```
//! use mustach_core::{apply, compile, ApplyProvider, BuildFlags, ApplyFlags, Limits, StringSink};
//! use std::borrow::Cow;
//!
//! struct Name<'a>(&'a str);
//!
//! impl ApplyProvider for Name<'_> {
//!     fn get(&mut self, name: &str) -> mustach_core::Result<Option<Cow<'_, str>>> {
//!         Ok((name == "name").then(|| Cow::Borrowed(self.0)))
//!     }
//!     fn enter(&mut self, _name: &str) -> mustach_core::Result<bool> {
//!         Ok(false)
//!     }
//!     fn next(&mut self) -> mustach_core::Result<bool> {
//!         Ok(false)
//!     }
//!     fn leave(&mut self) -> mustach_core::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let template = compile("Hello, {{name}}!", BuildFlags::empty(), None, &Limits::DEFAULT).unwrap();
//! let mut out = String::new();
//! apply(&template, &mut Name("world"), &mut StringSink::new(&mut out), ApplyFlags::empty(), &Limits::DEFAULT).unwrap();
//! assert_eq!(out, "Hello, world!");
//! ```

mod applier;
mod compiler;
mod debug;
mod error;
mod flags;
mod ir;
mod provider;
mod sink;
mod wrap;

pub use applier::{apply, apply_traced};
pub use compiler::compile;
pub use debug::{NullTracer, Tracer, WriterTracer};
pub use error::{Code, Error, Result};
pub use flags::{ApplyFlags, BuildFlags, Limits, WrapFlags};
pub use ir::Template;
pub use provider::{ApplyProvider, WrapProvider};
pub use sink::{Sink, StringSink, WriteSink};
pub use wrap::WrapAdapter;
