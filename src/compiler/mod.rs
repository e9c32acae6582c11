//! The one-pass scanner + encoder: turns template text into a `Template` IR.
//!
//! Raw-syntax recognition (`scanner`) stays separate from opcode emission
//! (this module). The grammar is scanned by hand rather than through a
//! generated PEG parser, since `{{=L R=}}` changes what byte sequence the
//! scanner matches on mid-parse, which a static grammar can't express.

mod scanner;

use crate::error::Error;
use crate::flags::{BuildFlags, Limits};
use crate::ir::{mkw, Op, Template, Word};
use scanner::{Delims, TagKind};

/// Compiles `source` into a `Template`.
pub fn compile(
    source: &str,
    flags: BuildFlags,
    name: Option<&str>,
    limits: &Limits,
) -> Result<Template, Error> {
    let owned: Box<str> = Box::from(source);
    let (code, pool) = {
        let mut c = Compiler::new(&owned, flags, *limits);
        c.run()?;
        (c.code, c.pool)
    };
    Ok(Template {
        source: owned,
        pool,
        code,
        name: name.map(str::to_string),
        flags,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    While,
    Unless,
    Parent,
    Block,
}

struct Frame {
    kind: FrameKind,
    tag: String,
    line: u32,
    /// False when this frame's opcode was skipped because it was lexically
    /// inside a suppressed `PARENT` region.
    emitted: bool,
    /// Address the loop body starts at; `NEXT` jumps here. Only meaningful
    /// for `FrameKind::While`.
    head_addr: u32,
    /// Address of the reserved end-address word to back-patch on close.
    end_slot: u32,
    /// `suppress` state to restore once this frame closes.
    saved_suppress: bool,
}

struct ParsedTag {
    kind: TagKind,
    name_start: usize,
    name_len: usize,
}

struct Compiler<'s> {
    bytes: &'s [u8],
    pos: usize,
    line: u32,
    delims: Delims,
    /// True while no non-whitespace, non-tag byte has been seen on the
    /// current line — the scanner's `standalone` state.
    standalone: bool,
    /// True while compiling the non-`BLOCK` body of a `PARENT` section.
    suppress: bool,
    code: Vec<Word>,
    pool: Vec<u8>,
    stack: Vec<Frame>,
    flags: BuildFlags,
    limits: Limits,
}

impl<'s> Compiler<'s> {
    fn new(source: &'s str, flags: BuildFlags, limits: Limits) -> Self {
        Compiler {
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            delims: Delims::default_pair(),
            standalone: true,
            suppress: false,
            code: Vec::new(),
            pool: Vec::new(),
            stack: Vec::new(),
            flags,
            limits,
        }
    }

    fn run(&mut self) -> Result<(), Error> {
        loop {
            let seg_start = self.pos;
            let mut line_start = self.pos;

            loop {
                if self.pos >= self.bytes.len() {
                    self.emit_text_run(seg_start, self.pos)?;
                    return self.finish();
                }
                if self.delims.matches_at(self.bytes, self.pos, &self.delims.open) {
                    break;
                }
                match self.bytes[self.pos] {
                    b'\r' => {
                        self.pos += 1;
                        if self.bytes.get(self.pos) == Some(&b'\n') {
                            self.pos += 1;
                        }
                        self.line += 1;
                        line_start = self.pos;
                        self.standalone = true;
                    }
                    b'\n' => {
                        self.pos += 1;
                        self.line += 1;
                        line_start = self.pos;
                        self.standalone = true;
                    }
                    b if scanner::is_line_blank(b) => {
                        self.pos += 1;
                    }
                    _ => {
                        self.pos += 1;
                        self.standalone = false;
                    }
                }
            }

            let tag_start = self.pos;
            let parsed = self.parse_tag()?;
            let eligible = self.standalone && parsed.kind.is_standalone_eligible();
            let is_standalone = eligible && self.try_consume_trailing_standalone();

            if is_standalone {
                self.emit_text_run(seg_start, line_start)?;
                let prefix = if line_start < tag_start {
                    Some((line_start, tag_start))
                } else {
                    None
                };
                self.emit_tag(parsed, prefix)?;
            } else {
                self.emit_text_run(seg_start, tag_start)?;
                self.emit_tag(parsed, None)?;
            }
        }
    }

    fn finish(&mut self) -> Result<(), Error> {
        if let Some(frame) = self.stack.last() {
            return Err(Error::UnexpectedEnd { line: frame.line });
        }
        self.code.push(mkw(Op::Stop, 0));
        self.code.push(mkw(Op::Stop, 0));
        Ok(())
    }

    fn emit_text_run(&mut self, start: usize, end: usize) -> Result<(), Error> {
        if end <= start || self.suppress {
            return Ok(());
        }
        let use_pool = self.flags.contains(BuildFlags::NULL_TERM_TEXT);
        self.emit_ref(Op::Text, start, end - start, use_pool)
    }

    fn emit_ref(&mut self, op: Op, start: usize, len: usize, use_pool: bool) -> Result<(), Error> {
        if len as u32 > self.limits.tag_value_max {
            return Err(Error::TooBig);
        }
        let offset = if use_pool {
            let off = self.pool.len() as u32;
            self.pool.extend_from_slice(&self.bytes[start..start + len]);
            off
        } else {
            start as u32
        };
        self.code.push(mkw(op, len as u32));
        self.code.push(offset);
        Ok(())
    }

    fn reserve_word(&mut self) -> u32 {
        let addr = self.code.len() as u32;
        self.code.push(0);
        addr
    }

    fn backpatch(&mut self, slot: u32, value: u32) {
        self.code[slot as usize] = value;
    }

    fn name_string(&self, parsed: &ParsedTag) -> String {
        std::str::from_utf8(&self.bytes[parsed.name_start..parsed.name_start + parsed.name_len])
            .unwrap_or("")
            .to_string()
    }

    fn check_name(&self, parsed: &ParsedTag) -> Result<(), Error> {
        if parsed.name_len == 0 && !self.flags.contains(BuildFlags::WITH_EMPTY_TAG) {
            return Err(Error::EmptyTag { line: self.line });
        }
        Ok(())
    }

    /// Scans past one tag (open delimiter already matched at `self.pos`),
    /// consuming through its close delimiter and applying `{{=L R=}}`
    /// delimiter changes in place.
    fn parse_tag(&mut self) -> Result<ParsedTag, Error> {
        let open_len = self.delims.open.len();
        self.pos += open_len;

        while self.bytes.get(self.pos).is_some_and(|&b| scanner::is_line_blank(b)) {
            self.pos += 1;
        }

        let with_colon = self.flags.contains(BuildFlags::WITH_COLON);
        let sigil = *self.bytes.get(self.pos).ok_or(Error::UnexpectedEnd { line: self.line })?;
        let kind = scanner::classify(sigil, with_colon);
        let sigil_consumed = !matches!(kind, TagKind::Escaped);
        if sigil_consumed {
            self.pos += 1;
        }

        let content_start = self.pos;
        let (name_end, close_end) = match kind {
            TagKind::UnescapedBrace => self.find_brace_close(content_start)?,
            TagKind::SetDelims => self.find_marked_close(content_start, b'=')?,
            _ => {
                let close_start = self
                    .delims
                    .find_close(self.bytes, content_start)
                    .ok_or(Error::UnexpectedEnd { line: self.line })?;
                (close_start, close_start + self.delims.close.len())
            }
        };

        let raw = &self.bytes[content_start..name_end];
        let trimmed = trim_ascii(raw);
        let name_start = content_start + trimmed.0;
        let name_len = trimmed.1;

        self.count_newlines(content_start, close_end);
        self.pos = close_end;

        if matches!(kind, TagKind::SetDelims) {
            self.apply_delimiter_change(name_start, name_len)?;
        }

        Ok(ParsedTag { kind, name_start, name_len })
    }

    /// Finds the close of a `{{{tag}}}`/`{{{tag}}}}` unescape tag: the byte
    /// `}` immediately followed by the active close delimiter.
    fn find_brace_close(&self, from: usize) -> Result<(usize, usize), Error> {
        let mut search_from = from;
        loop {
            let close_start = self
                .delims
                .find_close(self.bytes, search_from)
                .ok_or(Error::BadUnescapeTag { line: self.line })?;
            if close_start > from && self.bytes[close_start - 1] == b'}' {
                return Ok((close_start - 1, close_start + self.delims.close.len()));
            }
            search_from = close_start + self.delims.close.len().max(1);
        }
    }

    /// Finds the close of a `{{=L R=}}` tag: the byte `marker` immediately
    /// followed by the (still old, about-to-change) close delimiter.
    fn find_marked_close(&self, from: usize, marker: u8) -> Result<(usize, usize), Error> {
        let mut search_from = from;
        loop {
            let close_start = self
                .delims
                .find_close(self.bytes, search_from)
                .ok_or(Error::UnexpectedEnd { line: self.line })?;
            if close_start > from && self.bytes[close_start - 1] == marker {
                return Ok((close_start - 1, close_start + self.delims.close.len()));
            }
            search_from = close_start + self.delims.close.len().max(1);
        }
    }

    fn apply_delimiter_change(&mut self, start: usize, len: usize) -> Result<(), Error> {
        let content = &self.bytes[start..start + len];
        let mut parts = content
            .split(|&b| scanner::is_line_blank(b) || b == b'\n' || b == b'\r')
            .filter(|s| !s.is_empty());
        let open = parts.next().ok_or(Error::BadDelimiter { line: self.line })?;
        let close = parts.next().ok_or(Error::BadDelimiter { line: self.line })?;
        if parts.next().is_some() || open.is_empty() || close.is_empty() {
            return Err(Error::BadDelimiter { line: self.line });
        }
        self.delims.set(open, close);
        Ok(())
    }

    fn count_newlines(&mut self, from: usize, to: usize) {
        self.line += self.bytes[from..to].iter().filter(|&&b| b == b'\n').count() as u32;
    }

    fn try_consume_trailing_standalone(&mut self) -> bool {
        let mut p = self.pos;
        while p < self.bytes.len() && scanner::is_line_blank(self.bytes[p]) {
            p += 1;
        }
        if p >= self.bytes.len() {
            self.pos = p;
            return true;
        }
        match self.bytes[p] {
            b'\r' => {
                p += 1;
                if self.bytes.get(p) == Some(&b'\n') {
                    p += 1;
                }
                self.pos = p;
                self.line += 1;
                true
            }
            b'\n' => {
                p += 1;
                self.pos = p;
                self.line += 1;
                true
            }
            _ => false,
        }
    }

    fn emit_tag(&mut self, parsed: ParsedTag, prefix: Option<(usize, usize)>) -> Result<(), Error> {
        let use_pool_tag = self.flags.contains(BuildFlags::NULL_TERM_TAG);
        match parsed.kind {
            TagKind::Comment | TagKind::SetDelims => {}
            TagKind::Escaped | TagKind::Literal => {
                self.standalone = false;
                if !self.suppress {
                    self.check_name(&parsed)?;
                    self.emit_ref(Op::ReplEsc, parsed.name_start, parsed.name_len, use_pool_tag)?;
                }
            }
            TagKind::UnescapedBrace | TagKind::UnescapedAmp => {
                self.standalone = false;
                if !self.suppress {
                    self.check_name(&parsed)?;
                    self.emit_ref(Op::ReplRaw, parsed.name_start, parsed.name_len, use_pool_tag)?;
                }
            }
            TagKind::Partial => {
                if !self.suppress {
                    self.check_name(&parsed)?;
                    self.emit_prefix(prefix)?;
                    self.emit_ref(Op::Partial, parsed.name_start, parsed.name_len, use_pool_tag)?;
                }
            }
            TagKind::Section => self.open_section(FrameKind::While, parsed, Op::While, None)?,
            TagKind::Inverted => self.open_section(FrameKind::Unless, parsed, Op::Unless, None)?,
            TagKind::Parent => self.open_section(FrameKind::Parent, parsed, Op::Parent, prefix)?,
            TagKind::Block => self.open_section(FrameKind::Block, parsed, Op::Block, None)?,
            TagKind::CloseSection => self.close_section(parsed)?,
        }
        Ok(())
    }

    fn emit_prefix(&mut self, prefix: Option<(usize, usize)>) -> Result<(), Error> {
        if let Some((start, end)) = prefix {
            if end > start {
                let use_pool = self.flags.contains(BuildFlags::NULL_TERM_TEXT);
                self.emit_ref(Op::Prefix, start, end - start, use_pool)?;
            }
        }
        Ok(())
    }

    fn open_section(
        &mut self,
        kind: FrameKind,
        parsed: ParsedTag,
        op: Op,
        prefix: Option<(usize, usize)>,
    ) -> Result<(), Error> {
        self.check_name(&parsed)?;
        if self.stack.len() as u32 >= self.limits.max_depth {
            return Err(Error::TooDeep);
        }
        let tag = self.name_string(&parsed);
        let use_pool_tag = self.flags.contains(BuildFlags::NULL_TERM_TAG);
        let emitted = !self.suppress || matches!(kind, FrameKind::Block);
        let saved_suppress = self.suppress;

        let (head_addr, end_slot) = if emitted {
            if matches!(kind, FrameKind::Parent) {
                self.emit_prefix(prefix)?;
            }
            self.emit_ref(op, parsed.name_start, parsed.name_len, use_pool_tag)?;
            let end_slot = self.reserve_word();
            let head_addr = self.code.len() as u32;
            (head_addr, end_slot)
        } else {
            (0, 0)
        };

        match kind {
            FrameKind::Block => self.suppress = false,
            FrameKind::Parent => self.suppress = true,
            FrameKind::While | FrameKind::Unless => {}
        }

        self.stack.push(Frame {
            kind,
            tag,
            line: self.line,
            emitted,
            head_addr,
            end_slot,
            saved_suppress,
        });
        Ok(())
    }

    fn close_section(&mut self, parsed: ParsedTag) -> Result<(), Error> {
        let name = self.name_string(&parsed);
        let frame = self
            .stack
            .pop()
            .ok_or(Error::Closing { tag: name.clone(), line: self.line })?;
        if frame.tag != name {
            return Err(Error::Closing { tag: name, line: self.line });
        }
        if frame.emitted {
            match frame.kind {
                FrameKind::While => {
                    self.code.push(mkw(Op::Next, frame.head_addr));
                    let end_addr = self.code.len() as u32;
                    self.backpatch(frame.end_slot, end_addr);
                }
                FrameKind::Unless => {
                    let end_addr = self.code.len() as u32;
                    self.backpatch(frame.end_slot, end_addr);
                }
                FrameKind::Parent | FrameKind::Block => {
                    self.code.push(mkw(Op::End, 0));
                    let end_addr = self.code.len() as u32;
                    self.backpatch(frame.end_slot, end_addr);
                }
            }
        }
        if matches!(frame.kind, FrameKind::Parent | FrameKind::Block) {
            self.suppress = frame.saved_suppress;
        }
        Ok(())
    }
}

/// Returns `(offset, len)` of `bytes` with ASCII whitespace trimmed from
/// both ends.
fn trim_ascii(bytes: &[u8]) -> (usize, usize) {
    let mut start = 0;
    let mut end = bytes.len();
    while start < end && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    (start, end - start)
}
