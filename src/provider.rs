//! The two data-provider traits the applier and wrap layer drive.
//!
//! Kept as separate, minimal capability sets rather than one interface with
//! inheritance, per the engine's polymorphism guidance — a caller implements
//! whichever shape fits its data model; [`crate::wrap`] adapts `WrapProvider`
//! onto `ApplyProvider` for callers that want path-based key resolution.
//!
//! The original C interface threads results through an `sbuf` descriptor
//! (pointer + length + optional release callback) to let a value be returned
//! without an allocation. `Cow<str>` is the idiomatic equivalent: a provider
//! that already owns a `String` for a field can hand it over, one that only
//! has a borrowed slice can hand that over instead, and the caller never
//! needs a release callback.

use std::borrow::Cow;

use crate::error::Result;

/// Low-level provider the applier drives directly. A provider that wants
/// path-based resolution, object iteration, or comparison filters implements
/// [`WrapProvider`] instead and renders through [`crate::wrap::WrapAdapter`].
pub trait ApplyProvider {
    /// Called once before the first opcode runs.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called exactly once after rendering finishes, with the final outcome.
    fn stop(&mut self, _result: &Result<()>) {}

    /// Looks up a scalar value by tag name. `Ok(None)` renders as empty text.
    fn get(&mut self, name: &str) -> Result<Option<Cow<'_, str>>>;

    /// Tries to enter the named section. `Ok(true)` selects its first item
    /// as the current scope; `Ok(false)` means the section is empty/absent.
    fn enter(&mut self, name: &str) -> Result<bool>;

    /// Advances the section entered by the most recent `enter`.
    fn next(&mut self) -> Result<bool>;

    /// Leaves the section entered by the most recent `enter`. Always called
    /// exactly once after an `enter` that returned `true`, once iteration
    /// completes.
    fn leave(&mut self) -> Result<()>;

    /// Fetches the source text of a named partial. `Ok(None)` means the
    /// partial has no source to resolve; callers that want loading from a
    /// file or another store implement this themselves.
    fn partial_source(&mut self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// High-level provider the wrap layer adapts onto [`ApplyProvider`]:
/// path-based key resolution instead of raw tag-name lookup.
pub trait WrapProvider {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self, _result: &Result<()>) {}

    /// Compares the current selection's rendered text against `value`.
    fn compare(&mut self, value: &str) -> Result<std::cmp::Ordering>;

    /// Selects a named child of the current scope, walking toward the root
    /// until found. Returns whether the key resolved to anything. Under
    /// [`crate::flags::WrapFlags::WITH_SINGLE_DOT`], `key` is `"."` when the
    /// path named the current item itself rather than a child of it.
    fn sel(&mut self, key: &str) -> Result<bool>;

    /// Selects a named child of the *current selection* (not walking to
    /// root) — used for multi-segment paths after the first key.
    fn subsel(&mut self, key: &str) -> Result<bool>;

    /// Enters the current selection as a section. `object_iter` is true
    /// when the wildcard `*` syntax requested iteration over an object's
    /// entries rather than a list's items.
    fn enter(&mut self, object_iter: bool) -> Result<bool>;

    fn next(&mut self) -> Result<bool>;

    fn leave(&mut self) -> Result<()>;

    /// Renders the current selection as text. `is_key` is true when the
    /// object-iteration form requested the entry's key rather than its
    /// value.
    fn get(&mut self, is_key: bool) -> Result<Option<Cow<'_, str>>>;

    fn partial_source(&mut self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
