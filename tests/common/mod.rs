//! Shared test harness: a small in-memory JSON-like tree and an
//! `ApplyProvider` that walks it the way a real template consumer would.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use mustach_core::{
    apply, compile, ApplyFlags, ApplyProvider, BuildFlags, Limits, StringSink, WrapAdapter,
    WrapFlags, WrapProvider,
};

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Json {
    Null,
    Bool(bool),
    Str(String),
    List(Vec<Json>),
    Map(BTreeMap<String, Json>),
}

impl Json {
    pub fn s(v: impl Into<String>) -> Json {
        Json::Str(v.into())
    }

    pub fn map(pairs: &[(&str, Json)]) -> Json {
        Json::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    fn truthy(&self) -> bool {
        match self {
            Json::Null => false,
            Json::Bool(b) => *b,
            Json::Str(s) => !s.is_empty(),
            Json::List(l) => !l.is_empty(),
            Json::Map(m) => !m.is_empty(),
        }
    }
}

struct Frame<'a> {
    items: Vec<&'a Json>,
    idx: usize,
}

/// Walks a `Json` tree as a Mustache scope chain: `enter`/`next`/`leave`
/// push and pop list/map contexts, `get` resolves a scalar walking outward
/// from the innermost scope.
pub struct MapProvider<'a> {
    stack: Vec<&'a Json>,
    frames: Vec<Frame<'a>>,
    partials: BTreeMap<String, String>,
}

impl<'a> MapProvider<'a> {
    pub fn new(root: &'a Json) -> Self {
        MapProvider { stack: vec![root], frames: Vec::new(), partials: BTreeMap::new() }
    }

    pub fn with_partials(mut self, partials: BTreeMap<String, String>) -> Self {
        self.partials = partials;
        self
    }

    fn lookup(&self, name: &str) -> Option<&'a Json> {
        for scope in self.stack.iter().rev() {
            if let Json::Map(m) = scope {
                if let Some(v) = m.get(name) {
                    return Some(v);
                }
            }
        }
        None
    }
}

impl ApplyProvider for MapProvider<'_> {
    fn get(&mut self, name: &str) -> mustach_core::Result<Option<Cow<'_, str>>> {
        if name == "." {
            return Ok(match self.stack.last() {
                Some(Json::Str(s)) => Some(Cow::Borrowed(s.as_str())),
                Some(Json::Bool(b)) => Some(Cow::Owned(b.to_string())),
                _ => None,
            });
        }
        match self.lookup(name) {
            Some(Json::Str(s)) => Ok(Some(Cow::Borrowed(s.as_str()))),
            Some(Json::Bool(b)) => Ok(Some(Cow::Owned(b.to_string()))),
            _ => Ok(None),
        }
    }

    fn enter(&mut self, name: &str) -> mustach_core::Result<bool> {
        match self.lookup(name) {
            None => Ok(false),
            Some(Json::List(items)) => {
                if items.is_empty() {
                    return Ok(false);
                }
                let refs: Vec<&Json> = items.iter().collect();
                self.stack.push(refs[0]);
                self.frames.push(Frame { items: refs, idx: 0 });
                Ok(true)
            }
            Some(v) if v.truthy() => {
                self.stack.push(v);
                self.frames.push(Frame { items: vec![v], idx: 0 });
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    fn next(&mut self) -> mustach_core::Result<bool> {
        let frame = self.frames.last_mut().expect("next without enter");
        frame.idx += 1;
        if frame.idx < frame.items.len() {
            let item = frame.items[frame.idx];
            *self.stack.last_mut().expect("next without enter") = item;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn leave(&mut self) -> mustach_core::Result<()> {
        self.frames.pop();
        self.stack.pop();
        Ok(())
    }

    fn partial_source(&mut self, name: &str) -> mustach_core::Result<Option<String>> {
        Ok(self.partials.get(name).cloned())
    }
}

pub fn render(template: &str, root: &Json) -> mustach_core::Result<String> {
    render_with(template, BuildFlags::empty(), root, BTreeMap::new())
}

pub fn render_with(
    template: &str,
    flags: BuildFlags,
    root: &Json,
    partials: BTreeMap<String, String>,
) -> mustach_core::Result<String> {
    let tmpl = compile(template, flags, None, &Limits::DEFAULT)?;
    let mut out = String::new();
    let mut provider = MapProvider::new(root).with_partials(partials);
    apply(&tmpl, &mut provider, &mut StringSink::new(&mut out), ApplyFlags::empty(), &Limits::DEFAULT)?;
    Ok(out)
}

enum WrapFrame<'a> {
    Items(Vec<&'a Json>, usize),
    Entries(Vec<(&'a str, &'a Json)>, usize),
}

/// A [`WrapProvider`] over the same `Json` tree, exercising path-based
/// resolution instead of `MapProvider`'s raw tag-name lookup.
pub struct JsonWrapProvider<'a> {
    scope: Vec<&'a Json>,
    selection: Option<&'a Json>,
    frames: Vec<WrapFrame<'a>>,
}

impl<'a> JsonWrapProvider<'a> {
    pub fn new(root: &'a Json) -> Self {
        JsonWrapProvider { scope: vec![root], selection: None, frames: Vec::new() }
    }

    fn lookup(&self, key: &str) -> Option<&'a Json> {
        for scope in self.scope.iter().rev() {
            if let Json::Map(m) = scope {
                if let Some(v) = m.get(key) {
                    return Some(v);
                }
            }
        }
        None
    }

    fn render_scalar(v: &'a Json) -> Option<Cow<'a, str>> {
        match v {
            Json::Str(s) => Some(Cow::Borrowed(s.as_str())),
            Json::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }
}

impl<'a> WrapProvider for JsonWrapProvider<'a> {
    fn compare(&mut self, value: &str) -> mustach_core::Result<Ordering> {
        let rendered = self.selection.and_then(Self::render_scalar).unwrap_or_default();
        Ok(rendered.as_ref().cmp(value))
    }

    fn sel(&mut self, key: &str) -> mustach_core::Result<bool> {
        if key == "." {
            self.selection = self.scope.last().copied();
            return Ok(true);
        }
        self.selection = self.lookup(key);
        Ok(self.selection.is_some())
    }

    fn subsel(&mut self, key: &str) -> mustach_core::Result<bool> {
        let found = match self.selection {
            Some(Json::Map(m)) => m.get(key),
            _ => None,
        };
        self.selection = found;
        Ok(found.is_some())
    }

    fn enter(&mut self, object_iter: bool) -> mustach_core::Result<bool> {
        match self.selection {
            Some(Json::Map(m)) if object_iter => {
                if m.is_empty() {
                    return Ok(false);
                }
                let entries: Vec<(&str, &Json)> =
                    m.iter().map(|(k, v)| (k.as_str(), v)).collect();
                self.scope.push(entries[0].1);
                self.frames.push(WrapFrame::Entries(entries, 0));
                Ok(true)
            }
            Some(Json::List(items)) => {
                if items.is_empty() {
                    return Ok(false);
                }
                let refs: Vec<&Json> = items.iter().collect();
                self.scope.push(refs[0]);
                self.frames.push(WrapFrame::Items(refs, 0));
                Ok(true)
            }
            Some(v) if v.truthy() => {
                self.scope.push(v);
                self.frames.push(WrapFrame::Items(vec![v], 0));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn next(&mut self) -> mustach_core::Result<bool> {
        match self.frames.last_mut().expect("next without enter") {
            WrapFrame::Items(items, idx) => {
                *idx += 1;
                if *idx < items.len() {
                    *self.scope.last_mut().expect("next without enter") = items[*idx];
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            WrapFrame::Entries(entries, idx) => {
                *idx += 1;
                if *idx < entries.len() {
                    *self.scope.last_mut().expect("next without enter") = entries[*idx].1;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn leave(&mut self) -> mustach_core::Result<()> {
        self.frames.pop();
        self.scope.pop();
        Ok(())
    }

    fn get(&mut self, is_key: bool) -> mustach_core::Result<Option<Cow<'_, str>>> {
        if is_key {
            return Ok(match self.frames.last() {
                Some(WrapFrame::Entries(entries, idx)) => {
                    Some(Cow::Borrowed(entries[*idx].0))
                }
                _ => None,
            });
        }
        Ok(self.selection.and_then(Self::render_scalar))
    }
}

pub fn render_wrapped(template: &str, flags: WrapFlags, root: &Json) -> mustach_core::Result<String> {
    let tmpl = compile(template, BuildFlags::empty(), None, &Limits::DEFAULT)?;
    let mut out = String::new();
    let mut provider = JsonWrapProvider::new(root);
    let mut adapter = WrapAdapter::new(&mut provider, flags);
    apply(&tmpl, &mut adapter, &mut StringSink::new(&mut out), ApplyFlags::empty(), &Limits::DEFAULT)?;
    Ok(out)
}
