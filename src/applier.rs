//! The interpreter: walks a compiled `Template`'s bytecode, driving a
//! provider and streaming escaped/raw text to a sink.

use smallvec::SmallVec;

use crate::compiler;
use crate::debug::{NullTracer, Tracer};
use crate::error::{Error, Result};
use crate::flags::{ApplyFlags, Limits};
use crate::ir::{wval, Op, Template, Word};
use crate::provider::ApplyProvider;
use crate::sink::Sink;

/// Active partial/parent indentation prefixes, innermost last. Nesting rarely
/// runs deep, so this stays inline instead of heap-allocating for the common
/// case.
type PrefixStack = SmallVec<[String; 4]>;

/// Renders `template` against `provider`, writing to `sink`.
pub fn apply(
    template: &Template,
    provider: &mut dyn ApplyProvider,
    sink: &mut dyn Sink,
    flags: ApplyFlags,
    limits: &Limits,
) -> Result<()> {
    apply_traced(template, provider, sink, flags, limits, &mut NullTracer)
}

/// Like [`apply`], but reports opcode dispatch and provider calls to `tracer`.
pub fn apply_traced(
    template: &Template,
    provider: &mut dyn ApplyProvider,
    sink: &mut dyn Sink,
    flags: ApplyFlags,
    limits: &Limits,
    tracer: &mut dyn Tracer,
) -> Result<()> {
    tracer.apply_start(template.name());
    provider.start()?;
    let mut prefixes: PrefixStack = SmallVec::new();
    let mut bol = true;
    let result = exec_range(
        template,
        0,
        template.code().len() as u32,
        provider,
        sink,
        flags,
        limits,
        0,
        &mut prefixes,
        &mut bol,
        None,
        tracer,
    );
    provider.stop(&result);
    tracer.apply_end(&result);
    result
}

/// One link of the inheritance chain: `template` holds the override region
/// `[origin, end)` that was the body of a `PARENT` invocation in a caller.
struct ParentLink<'t> {
    template: &'t Template,
    origin: u32,
    end: u32,
    parent: Option<&'t ParentLink<'t>>,
}

enum Flow {
    Continue(u32),
    Stop,
}

#[allow(clippy::too_many_arguments)]
fn exec_range<'t>(
    template: &'t Template,
    start_pc: u32,
    stop_pc: u32,
    provider: &mut dyn ApplyProvider,
    sink: &mut dyn Sink,
    flags: ApplyFlags,
    limits: &Limits,
    nesting: u32,
    prefixes: &mut PrefixStack,
    bol: &mut bool,
    parent: Option<&ParentLink<'t>>,
    tracer: &mut dyn Tracer,
) -> Result<()> {
    let mut pc = start_pc;
    let code = template.code();

    while pc < stop_pc {
        let word = code[pc as usize];
        let op = Op::from_word(word);

        if op == Op::Prefix {
            let len = wval(word);
            let offset = code[pc as usize + 1];
            let text = template.text_ref(offset, len).to_string();
            prefixes.push(text);
            let inner_pc = pc + 2;
            let inner_word = code[inner_pc as usize];
            let inner_op = Op::from_word(inner_word);
            tracer.dispatch(inner_pc, inner_op);
            let flow = dispatch(
                inner_op, inner_word, inner_pc, template, provider, sink, flags, limits, nesting,
                prefixes, bol, parent, tracer,
            )?;
            prefixes.pop();
            pc = match flow {
                Flow::Continue(next) => next,
                Flow::Stop => return Ok(()),
            };
            continue;
        }

        tracer.dispatch(pc, op);
        match dispatch(
            op, word, pc, template, provider, sink, flags, limits, nesting, prefixes, bol, parent,
            tracer,
        )? {
            Flow::Continue(next) => pc = next,
            Flow::Stop => return Ok(()),
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn dispatch<'t>(
    op: Op,
    word: Word,
    pc: u32,
    template: &'t Template,
    provider: &mut dyn ApplyProvider,
    sink: &mut dyn Sink,
    flags: ApplyFlags,
    limits: &Limits,
    nesting: u32,
    prefixes: &mut PrefixStack,
    bol: &mut bool,
    parent: Option<&ParentLink<'t>>,
    tracer: &mut dyn Tracer,
) -> Result<Flow> {
    let code = template.code();
    match op {
        Op::Stop => Ok(Flow::Stop),

        Op::Line => Ok(Flow::Continue(pc + 1)),

        Op::Text => {
            let len = wval(word);
            let offset = code[pc as usize + 1];
            let text = template.text_ref(offset, len);
            emit_bytes(text.as_bytes(), false, sink, prefixes, bol)?;
            Ok(Flow::Continue(pc + 2))
        }

        Op::ReplRaw | Op::ReplEsc => {
            let len = wval(word);
            let offset = code[pc as usize + 1];
            let name = template.tag_ref(offset, len);
            let value = provider.get(name)?;
            tracer.provider_get(name, value.is_some());
            if let Some(value) = value {
                emit_bytes(value.as_bytes(), op == Op::ReplEsc, sink, prefixes, bol)?;
            }
            Ok(Flow::Continue(pc + 2))
        }

        Op::Partial => {
            let len = wval(word);
            let offset = code[pc as usize + 1];
            let name = template.tag_ref(offset, len).to_string();
            run_partial(
                &name, template, provider, sink, flags, limits, nesting, prefixes, bol, tracer,
            )?;
            Ok(Flow::Continue(pc + 2))
        }

        Op::While => {
            let len = wval(word);
            let offset = code[pc as usize + 1];
            let end_addr = code[pc as usize + 2];
            let name = template.tag_ref(offset, len);
            let entered = provider.enter(name)?;
            tracer.provider_enter(name, entered);
            if entered {
                Ok(Flow::Continue(pc + 3))
            } else {
                Ok(Flow::Continue(end_addr))
            }
        }

        Op::Next => {
            let target = wval(word);
            let has_more = provider.next()?;
            tracer.provider_next(has_more);
            if has_more {
                Ok(Flow::Continue(target))
            } else {
                provider.leave()?;
                tracer.provider_leave();
                Ok(Flow::Continue(pc + 1))
            }
        }

        Op::Unless => {
            let len = wval(word);
            let offset = code[pc as usize + 1];
            let end_addr = code[pc as usize + 2];
            let name = template.tag_ref(offset, len);
            let entered = provider.enter(name)?;
            tracer.provider_enter(name, entered);
            if entered {
                provider.leave()?;
                tracer.provider_leave();
                Ok(Flow::Continue(end_addr))
            } else {
                Ok(Flow::Continue(pc + 3))
            }
        }

        Op::Parent => {
            let len = wval(word);
            let offset = code[pc as usize + 1];
            let end_addr = code[pc as usize + 2];
            let name = template.tag_ref(offset, len).to_string();
            let origin = pc + 3;
            if nesting + 1 > limits.max_nesting {
                return Err(Error::TooMuchNesting);
            }
            let source = provider.partial_source(&name)?;
            tracer.partial_resolved(&name, source.is_some());
            match source {
                Some(source) => {
                    let partial_tmpl = compiler::compile(&source, template.flags(), Some(&name), limits)?;
                    let link = ParentLink { template, origin, end: end_addr, parent };
                    exec_range(
                        &partial_tmpl,
                        0,
                        partial_tmpl.code().len() as u32,
                        provider,
                        sink,
                        flags,
                        limits,
                        nesting + 1,
                        prefixes,
                        bol,
                        Some(&link),
                        tracer,
                    )?;
                }
                None => return Err(Error::NotFound(name)),
            }
            Ok(Flow::Continue(end_addr))
        }

        Op::Block => {
            let len = wval(word);
            let offset = code[pc as usize + 1];
            let block_end = code[pc as usize + 2];
            let name = template.tag_ref(offset, len);
            let body_start = pc + 3;
            match find_override(parent, name) {
                Some((found_template, start, end, outer_parent)) => {
                    exec_range(
                        found_template, start, end, provider, sink, flags, limits, nesting,
                        prefixes, bol, outer_parent, tracer,
                    )?;
                }
                None => {
                    exec_range(
                        template,
                        body_start,
                        block_end - 1,
                        provider,
                        sink,
                        flags,
                        limits,
                        nesting,
                        prefixes,
                        bol,
                        parent,
                        tracer,
                    )?;
                }
            }
            Ok(Flow::Continue(block_end))
        }

        Op::End => Ok(Flow::Continue(pc + 1)),

        Op::Prefix => unreachable!("PREFIX is handled by exec_range before dispatch"),

        Op::Unprefix => Ok(Flow::Continue(pc + 2)),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_partial(
    name: &str,
    caller: &Template,
    provider: &mut dyn ApplyProvider,
    sink: &mut dyn Sink,
    flags: ApplyFlags,
    limits: &Limits,
    nesting: u32,
    prefixes: &mut PrefixStack,
    bol: &mut bool,
    tracer: &mut dyn Tracer,
) -> Result<()> {
    if nesting + 1 > limits.max_nesting {
        return Err(Error::TooMuchNesting);
    }
    let source = provider.partial_source(name)?;
    tracer.partial_resolved(name, source.is_some());
    match source {
        Some(source) => {
            let partial_tmpl = compiler::compile(&source, caller.flags(), Some(name), limits)?;
            exec_range(
                &partial_tmpl,
                0,
                partial_tmpl.code().len() as u32,
                provider,
                sink,
                flags,
                limits,
                nesting + 1,
                prefixes,
                bol,
                None,
                tracer,
            )
        }
        None => Ok(()),
    }
}

/// Searches the calling-parent chain, nearest first, for a `BLOCK` named
/// `name` in its override region.
fn find_override<'t>(
    mut link: Option<&ParentLink<'t>>,
    name: &str,
) -> Option<(&'t Template, u32, u32, Option<&'t ParentLink<'t>>)> {
    while let Some(l) = link {
        if let Some((start, end)) = scan_for_block(l.template, l.origin, l.end, name) {
            return Some((l.template, start, end, l.parent));
        }
        link = l.parent;
    }
    None
}

/// Walks a flat code range, using each construct's own back-patched
/// end-address to jump over nested bodies, looking for a top-level `BLOCK`
/// opcode named `name`.
fn scan_for_block(template: &Template, mut pc: u32, end: u32, name: &str) -> Option<(u32, u32)> {
    let code = template.code();
    while pc < end {
        let word = code[pc as usize];
        match Op::from_word(word) {
            Op::Stop => break,
            Op::Line | Op::End | Op::Next => pc += 1,
            Op::Text | Op::ReplRaw | Op::ReplEsc | Op::Partial | Op::Prefix | Op::Unprefix => pc += 2,
            Op::While | Op::Unless | Op::Parent => {
                let end_addr = code[pc as usize + 2];
                pc = end_addr;
            }
            Op::Block => {
                let len = wval(word);
                let offset = code[pc as usize + 1];
                let block_end = code[pc as usize + 2];
                let body_start = pc + 3;
                if template.tag_ref(offset, len) == name {
                    return Some((body_start, block_end - 1));
                }
                pc = block_end;
            }
        }
    }
    None
}

/// Emits `bytes` through `sink`, applying the active indentation prefixes at
/// the start of every line and, when `escape` is set, HTML-escaping
/// `<`, `>`, `&`, `"`.
fn emit_bytes(
    bytes: &[u8],
    escape: bool,
    sink: &mut dyn Sink,
    prefixes: &[String],
    bol: &mut bool,
) -> Result<()> {
    let mut i = 0;
    while i < bytes.len() {
        if *bol {
            for p in prefixes {
                sink.write_raw(p.as_bytes())?;
            }
        }
        let rest = &bytes[i..];
        match rest.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(n) => {
                emit_chunk(&rest[..n], escape, sink)?;
                let mut consumed = n + 1;
                if rest[n] == b'\r' && rest.get(n + 1) == Some(&b'\n') {
                    consumed += 1;
                }
                sink.write_raw(&rest[n..consumed])?;
                *bol = true;
                i += consumed;
            }
            None => {
                emit_chunk(rest, escape, sink)?;
                *bol = false;
                i = bytes.len();
            }
        }
    }
    Ok(())
}

fn emit_chunk(bytes: &[u8], escape: bool, sink: &mut dyn Sink) -> Result<()> {
    if !escape {
        if !bytes.is_empty() {
            sink.write_raw(bytes)?;
        }
        return Ok(());
    }
    let mut last = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let esc: &[u8] = match b {
            b'<' => b"&lt;",
            b'>' => b"&gt;",
            b'&' => b"&amp;",
            b'"' => b"&quot;",
            _ => continue,
        };
        if i > last {
            sink.write_raw(&bytes[last..i])?;
        }
        sink.write_raw(esc)?;
        last = i + 1;
    }
    if last < bytes.len() {
        sink.write_raw(&bytes[last..])?;
    }
    Ok(())
}
