//! The word-oriented intermediate representation the compiler emits and the
//! applier walks.
//!
//! The original engine chains fixed-size blocks together and packs addresses
//! as `(block-index, word-offset)` to bound each allocation. A `Template`
//! here owns one contiguous `Vec<u32>` instead (permitted by the design notes
//! for targets without a bounded-stack allocator) so an `Address` is simply a
//! word index into `code`.

use crate::flags::BuildFlags;

pub type Word = u32;
pub type Address = u32;

const OP_BITS: u32 = 4;
const OP_MASK: u32 = 0xF;

/// One opcode of the bytecode stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    Stop = 0,
    Line = 1,
    Text = 2,
    ReplRaw = 3,
    ReplEsc = 4,
    Partial = 5,
    While = 6,
    Next = 7,
    Unless = 8,
    Parent = 9,
    Block = 10,
    End = 11,
    Prefix = 12,
    Unprefix = 13,
}

impl Op {
    pub(crate) fn from_word(word: Word) -> Op {
        match word & OP_MASK {
            0 => Op::Stop,
            1 => Op::Line,
            2 => Op::Text,
            3 => Op::ReplRaw,
            4 => Op::ReplEsc,
            5 => Op::Partial,
            6 => Op::While,
            7 => Op::Next,
            8 => Op::Unless,
            9 => Op::Parent,
            10 => Op::Block,
            11 => Op::End,
            12 => Op::Prefix,
            13 => Op::Unprefix,
            other => unreachable!("opcode nibble {other} has no Op mapping"),
        }
    }
}

/// Packs an opcode and its immediate into one word.
pub(crate) fn mkw(op: Op, value: u32) -> Word {
    (op as u32) | (value << OP_BITS)
}

/// Extracts the immediate (upper 28 bits) of a word.
pub(crate) fn wval(word: Word) -> u32 {
    word >> OP_BITS
}

/// A compiled template: the source text it was built from, its owned inline
/// copy pool (used only under `NULL_TERM_TAG`/`NULL_TERM_TEXT`), the bytecode
/// stream, and the flags it was compiled with.
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) source: Box<str>,
    pub(crate) pool: Vec<u8>,
    pub(crate) code: Vec<Word>,
    pub(crate) name: Option<String>,
    pub(crate) flags: BuildFlags,
}

impl Template {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn flags(&self) -> BuildFlags {
        self.flags
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn code(&self) -> &[Word] {
        &self.code
    }

    /// Resolves a `TEXT`/`PREFIX` reference (governed by `NULL_TERM_TEXT`).
    pub(crate) fn text_ref(&self, offset: u32, len: u32) -> &str {
        self.resolve(self.flags.contains(BuildFlags::NULL_TERM_TEXT), offset, len)
    }

    /// Resolves a tag-name reference used by `REPL_*`/`PARTIAL`/`WHILE`/
    /// `UNLESS`/`PARENT`/`BLOCK` (governed by `NULL_TERM_TAG`).
    pub(crate) fn tag_ref(&self, offset: u32, len: u32) -> &str {
        self.resolve(self.flags.contains(BuildFlags::NULL_TERM_TAG), offset, len)
    }

    fn resolve(&self, pooled: bool, offset: u32, len: u32) -> &str {
        let (start, end) = (offset as usize, offset as usize + len as usize);
        let bytes = if pooled {
            &self.pool[start..end]
        } else {
            &self.source.as_bytes()[start..end]
        };
        // Both pools are filled exclusively with byte ranges the scanner cut at
        // delimiter/newline boundaries, which are always ASCII in valid UTF-8.
        std::str::from_utf8(bytes).unwrap_or("")
    }
}
