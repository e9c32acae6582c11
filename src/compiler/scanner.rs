//! Low-level delimiter and tag-kind recognition, kept separate from opcode
//! emission so raw-syntax parsing stays independent of operation lowering.

/// Current open/close delimiter strings. Mutable at runtime via `{{=L R=}}`.
#[derive(Debug, Clone)]
pub(crate) struct Delims {
    pub open: Vec<u8>,
    pub close: Vec<u8>,
}

impl Delims {
    pub fn default_pair() -> Self {
        Delims {
            open: b"{{".to_vec(),
            close: b"}}".to_vec(),
        }
    }

    pub fn set(&mut self, open: &[u8], close: &[u8]) {
        self.open = open.to_vec();
        self.close = close.to_vec();
    }

    /// True if `close` is made up entirely of `}` bytes (selects which
    /// unescape-tag grammar applies, per `mustach2.c`'s `ex_build`).
    pub fn close_is_all_braces(&self) -> bool {
        !self.close.is_empty() && self.close.iter().all(|&b| b == b'}')
    }

    pub fn find_open(&self, bytes: &[u8], from: usize) -> Option<usize> {
        find_sub(bytes, from, &self.open)
    }

    pub fn find_close(&self, bytes: &[u8], from: usize) -> Option<usize> {
        find_sub(bytes, from, &self.close)
    }

    pub fn matches_at(&self, bytes: &[u8], at: usize, needle: &[u8]) -> bool {
        bytes[at..].starts_with(needle)
    }
}

/// Byte-for-byte substring search (no alignment/utf8 assumptions needed since
/// delimiters are always ASCII in practice, but this works for any bytes).
fn find_sub(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    memchr::memmem::find(&haystack[from..], needle).map(|i| i + from)
}

/// The sigil-selected kind of a tag, after the open delimiter and before the
/// trimmed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Comment,
    SetDelims,
    UnescapedBrace,
    UnescapedAmp,
    Inverted,
    Section,
    CloseSection,
    Partial,
    Block,
    Parent,
    Literal,
    Escaped,
}

impl TagKind {
    /// Standalone elision applies to every non-emitting kind. The `:` literal
    /// tag is an explicit exception: the original engine always marks it
    /// non-standalone regardless of what surrounds it.
    pub fn is_standalone_eligible(self) -> bool {
        !matches!(
            self,
            TagKind::Escaped | TagKind::UnescapedBrace | TagKind::UnescapedAmp | TagKind::Literal
        )
    }

    pub fn opens_section(self) -> bool {
        matches!(
            self,
            TagKind::Section | TagKind::Inverted | TagKind::Parent | TagKind::Block
        )
    }
}

pub(crate) fn classify(sigil: u8, with_colon: bool) -> TagKind {
    match sigil {
        b'!' => TagKind::Comment,
        b'=' => TagKind::SetDelims,
        b'{' => TagKind::UnescapedBrace,
        b'&' => TagKind::UnescapedAmp,
        b'^' => TagKind::Inverted,
        b'#' => TagKind::Section,
        b'/' => TagKind::CloseSection,
        b'>' => TagKind::Partial,
        b'$' => TagKind::Block,
        b'<' => TagKind::Parent,
        b':' if with_colon => TagKind::Literal,
        _ => TagKind::Escaped,
    }
}

pub(crate) fn is_line_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | 0x0c | 0x0b)
}
