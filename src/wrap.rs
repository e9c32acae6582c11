//! Adapts a path-resolving [`WrapProvider`] onto the low-level
//! [`ApplyProvider`] the applier drives, resolving dotted paths, JSON
//! pointers, the single-dot self-reference, wildcard object iteration and
//! equality/comparison filters.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::flags::WrapFlags;
use crate::provider::{ApplyProvider, WrapProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

struct Filter {
    negate: bool,
    cmp: Cmp,
    value: String,
}

/// Splits a trailing comparator (`=v`, `<v`, `<=v`, `>v`, `>=v`, optionally
/// `!`-negated) off a path, honoring the escape-first extension that lets a
/// literal key contain a comparator character.
fn split_filter(path: &str, flags: WrapFlags) -> (String, Option<Filter>) {
    if !flags.intersects(WrapFlags::WITH_COMPARE | WrapFlags::WITH_EQUAL) {
        return (path.to_string(), None);
    }
    let chars: Vec<char> = path.chars().collect();
    let mut key = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\'
            && flags.contains(WrapFlags::WITH_ESC_FIRST_CMP)
            && matches!(chars.get(i + 1), Some('=') | Some('<') | Some('>') | Some('!'))
        {
            key.push(chars[i + 1]);
            i += 2;
            continue;
        }
        let is_eq = c == '=' && flags.contains(WrapFlags::WITH_EQUAL);
        let is_ord = matches!(c, '<' | '>') && flags.contains(WrapFlags::WITH_COMPARE);
        let is_neg =
            c == '!' && chars.get(i + 1) == Some(&'=') && flags.contains(WrapFlags::WITH_EQUAL);
        if is_eq || is_ord || is_neg {
            let negate = c == '!';
            let mut j = if negate { i + 1 } else { i };
            let cmp = match chars[j] {
                '=' => {
                    j += 1;
                    Cmp::Eq
                }
                '<' => {
                    j += 1;
                    if chars.get(j) == Some(&'=') {
                        j += 1;
                        Cmp::Le
                    } else {
                        Cmp::Lt
                    }
                }
                '>' => {
                    j += 1;
                    if chars.get(j) == Some(&'=') {
                        j += 1;
                        Cmp::Ge
                    } else {
                        Cmp::Gt
                    }
                }
                _ => unreachable!(),
            };
            let value: String = chars[j..].iter().collect();
            return (key, Some(Filter { negate, cmp, value }));
        }
        key.push(c);
        i += 1;
    }
    (key, None)
}

fn unescape_pointer_segment(seg: &str) -> String {
    seg.replace("~1", "/").replace("~0", "~")
}

fn split_segments(key: &str, flags: WrapFlags) -> Vec<String> {
    if flags.contains(WrapFlags::WITH_JSON_POINTER) && key.starts_with('/') {
        key[1..].split('/').map(unescape_pointer_segment).collect()
    } else {
        key.split('.').map(str::to_string).collect()
    }
}

/// Navigates `wp` to the scope `path` names. Returns whether the path
/// resolved and whether it requested wildcard object iteration.
fn resolve(wp: &mut dyn WrapProvider, flags: WrapFlags, path: &str) -> Result<(bool, bool)> {
    if flags.contains(WrapFlags::WITH_SINGLE_DOT) && path == "." {
        return Ok((wp.sel(".")?, false));
    }

    let (key, filter) = split_filter(path, flags);

    let object_iter = flags.contains(WrapFlags::WITH_OBJECT_ITER)
        && (key == "*" || key.ends_with(".*") || key.ends_with("/*"));
    let nav_key = if object_iter {
        key.strip_suffix(".*").or_else(|| key.strip_suffix("/*")).unwrap_or("")
    } else {
        key.as_str()
    };

    let found = if nav_key.is_empty() {
        true
    } else {
        let segs = split_segments(nav_key, flags);
        let mut iter = segs.iter();
        let Some(first) = iter.next() else {
            return Ok((false, object_iter));
        };
        let mut ok = wp.sel(first)?;
        for seg in iter {
            if !ok {
                break;
            }
            ok = wp.subsel(seg)?;
        }
        ok
    };

    if !found {
        return Ok((false, object_iter));
    }

    match filter {
        None => Ok((true, object_iter)),
        Some(f) => {
            let ord = wp.compare(&f.value)?;
            let matched = match f.cmp {
                Cmp::Eq => ord == Ordering::Equal,
                Cmp::Lt => ord == Ordering::Less,
                Cmp::Le => ord != Ordering::Greater,
                Cmp::Gt => ord == Ordering::Greater,
                Cmp::Ge => ord != Ordering::Less,
            };
            Ok((if f.negate { !matched } else { matched }, object_iter))
        }
    }
}

const DEFAULT_PARTIAL_EXT: &str = ".mustache";

fn load_partial_file(name: &str, ext: &str) -> Result<Option<String>> {
    match std::fs::read_to_string(name) {
        Ok(s) => return Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::System(e.to_string())),
    }
    match std::fs::read_to_string(format!("{name}{ext}")) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::System(e.to_string())),
    }
}

/// Adapts a [`WrapProvider`] into an [`ApplyProvider`] the applier can
/// drive directly.
pub struct WrapAdapter<'p, P: WrapProvider + ?Sized> {
    inner: &'p mut P,
    flags: WrapFlags,
    partial_ext: String,
}

impl<'p, P: WrapProvider + ?Sized> WrapAdapter<'p, P> {
    pub fn new(inner: &'p mut P, flags: WrapFlags) -> Self {
        WrapAdapter { inner, flags, partial_ext: DEFAULT_PARTIAL_EXT.to_string() }
    }

    pub fn with_partial_extension(mut self, ext: impl Into<String>) -> Self {
        self.partial_ext = ext.into();
        self
    }
}

impl<'p, P: WrapProvider + ?Sized> ApplyProvider for WrapAdapter<'p, P> {
    fn start(&mut self) -> Result<()> {
        self.inner.start()
    }

    fn stop(&mut self, result: &Result<()>) {
        self.inner.stop(result)
    }

    fn get(&mut self, name: &str) -> Result<Option<Cow<'_, str>>> {
        let (found, _) = resolve(self.inner, self.flags, name)?;
        if !found {
            if self.flags.contains(WrapFlags::ERROR_UNDEFINED) {
                return Err(Error::UndefinedTag(name.to_string()));
            }
            return Ok(None);
        }
        self.inner.get(false)
    }

    fn enter(&mut self, name: &str) -> Result<bool> {
        let (found, object_iter) = resolve(self.inner, self.flags, name)?;
        if !found {
            return Ok(false);
        }
        self.inner.enter(object_iter)
    }

    fn next(&mut self) -> Result<bool> {
        self.inner.next()
    }

    fn leave(&mut self) -> Result<()> {
        self.inner.leave()
    }

    fn partial_source(&mut self, name: &str) -> Result<Option<String>> {
        let from_data = |inner: &mut P| inner.partial_source(name);
        let from_file = || -> Result<Option<String>> {
            if self.flags.contains(WrapFlags::WITH_INC_PARTIAL) {
                load_partial_file(name, &self.partial_ext)
            } else {
                Ok(None)
            }
        };
        if self.flags.contains(WrapFlags::PARTIAL_DATA_FIRST) {
            if let Some(s) = from_data(self.inner)? {
                return Ok(Some(s));
            }
            from_file()
        } else {
            if let Some(s) = from_file()? {
                return Ok(Some(s));
            }
            from_data(self.inner)
        }
    }
}
