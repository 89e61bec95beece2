//! Component D: pass header parsing, and the [`PassHook`] descriptor it
//! builds.

use crate::bytes::{self, Span};
use crate::error::ParseError;
use crate::expr::{self, SzExp};
use arrayvec::ArrayVec;

const DEFAULT_DESC: &str = "(unknown)";

/// A 2×2 transform with translation, as written by `//!OFFSET x y`.
///
/// `spec.md` §9 marks applying this at dispatch time an open question
/// ("TODO apply transform" in the source); this crate preserves that:
/// the field is parsed and stored so a future renderer can use it
/// without a document-format break, but the engine never reads it.
/// Only the translation is representable because the source format
/// never writes anything but an `x y` pair — see `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    pub translation: [f32; 2],
}

impl Default for Offset {
    fn default() -> Self {
        Offset { translation: [0.0, 0.0] }
    }
}

impl Offset {
    pub fn is_finite(&self) -> bool {
        self.translation.iter().all(|v| v.is_finite())
    }
}

/// A descriptor for one user pass (`spec.md` §3).
#[derive(Debug, Clone)]
pub struct PassHook {
    desc: Option<Span>,
    pub hook_tex: ArrayVec<Span, 16>,
    pub bind_tex: ArrayVec<Span, 16>,
    pub save_tex: Option<Span>,
    pub body: Span,
    pub offset: Offset,
    pub components: i32,
    pub width: SzExp,
    pub height: SzExp,
    pub cond: SzExp,
    pub is_compute: bool,
    pub block_w: i32,
    pub block_h: i32,
    pub threads_w: i32,
    pub threads_h: i32,
}

impl Default for PassHook {
    fn default() -> Self {
        PassHook {
            desc: None,
            hook_tex: ArrayVec::new(),
            bind_tex: ArrayVec::new(),
            save_tex: None,
            body: Span::EMPTY,
            offset: Offset::default(),
            components: 0,
            width: expr::hooked_dim(true),
            height: expr::hooked_dim(false),
            cond: expr::always_true(),
            is_compute: false,
            block_w: 0,
            block_h: 0,
            threads_w: 0,
            threads_h: 0,
        }
    }
}

impl PassHook {
    /// Resolve this pass's human description, falling back to
    /// `"(unknown)"` when no `//!DESC` line was present.
    pub fn desc<'a>(&self, source: &'a str) -> &'a str {
        match self.desc {
            Some(span) => span.resolve(source),
            None => DEFAULT_DESC,
        }
    }
}

/// Parse one pass block starting at `block` (a subslice of `source`
/// beginning with `//!`, not `//!TEXTURE`). Returns the built
/// [`PassHook`], whether it has at least one `HOOK` stage (for the
/// non-fatal "no hook stages" warning), and the residual document.
pub fn parse_pass_block<'a>(
    source: &str,
    block: &'a str,
) -> Result<(PassHook, &'a str), ParseError> {
    let mut pass = PassHook::default();

    let mut rest = block;
    loop {
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let line = &rest[..line_end];
        if !line.starts_with("//!") {
            break;
        }
        let header = bytes::eat_start(line, "//!");
        let (command, args) = split_command(header);
        apply_command(source, &mut pass, command, args)?;

        // An empty-slice tail of `rest`, not a literal, so `body` below
        // stays a valid subslice of `source` even with no trailing '\n'.
        rest = if line_end < rest.len() { &rest[line_end + 1..] } else { &rest[rest.len()..] };
    }

    let (body, residual) = match bytes::find(rest, "//!") {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, &rest[rest.len()..]),
    };
    pass.body = Span::from_subslice(source, body);

    if pass.hook_tex.is_empty() {
        log::warn!("pass '{}' has no HOOK stages and will never execute", pass.desc(source));
    }

    Ok((pass, residual))
}

fn split_command(header: &str) -> (&str, &str) {
    match header.split_once(' ') {
        Some((cmd, rest)) => (cmd, rest.trim()),
        // An empty-slice tail of `header` rather than a `&'static str` literal,
        // so it still points into `source` and `Span::from_subslice` stays valid.
        None => (header.trim(), &header[header.len()..]),
    }
}

fn apply_command(source: &str, pass: &mut PassHook, command: &str, args: &str) -> Result<(), ParseError> {
    match command {
        "HOOK" => push_span(&mut pass.hook_tex, source, args, "HOOK"),
        "BIND" => push_span(&mut pass.bind_tex, source, args, "BIND"),
        "SAVE" => {
            pass.save_tex = Some(Span::from_subslice(source, args));
            Ok(())
        }
        "DESC" => {
            pass.desc = Some(Span::from_subslice(source, args));
            Ok(())
        }
        "OFFSET" => {
            let mut toks = bytes::tokens(args);
            let x = next_f32(&mut toks, "OFFSET")?;
            let y = next_f32(&mut toks, "OFFSET")?;
            if toks.next().is_some() {
                return Err(ParseError::syntax(0, "OFFSET takes exactly two floats"));
            }
            let offset = Offset { translation: [x, y] };
            if !offset.is_finite() {
                return Err(ParseError::syntax(0, "OFFSET must be finite"));
            }
            pass.offset = offset;
            Ok(())
        }
        "WIDTH" => {
            pass.width = expr::parse(args)?;
            Ok(())
        }
        "HEIGHT" => {
            pass.height = expr::parse(args)?;
            Ok(())
        }
        "WHEN" => {
            pass.cond = expr::parse(args)?;
            Ok(())
        }
        "COMPONENTS" => {
            pass.components = args
                .trim()
                .parse()
                .map_err(|_| ParseError::syntax(0, format!("invalid COMPONENTS '{args}'")))?;
            Ok(())
        }
        "COMPUTE" => parse_compute(pass, args),
        other => Err(ParseError::syntax(0, format!("unrecognized command '{other}'"))),
    }
}

fn push_span(
    into: &mut ArrayVec<Span, 16>,
    source: &str,
    args: &str,
    command: &str,
) -> Result<(), ParseError> {
    if into.is_full() {
        return Err(ParseError::syntax(0, format!("{command} exceeds 16 entries")));
    }
    into.push(Span::from_subslice(source, args));
    Ok(())
}

fn next_f32<'a>(toks: &mut impl Iterator<Item = &'a str>, command: &str) -> Result<f32, ParseError> {
    let tok = toks
        .next()
        .ok_or_else(|| ParseError::syntax(0, format!("{command} is missing an argument")))?;
    bytes::parse_f32(tok).ok_or_else(|| ParseError::syntax(0, format!("invalid {command} float '{tok}'")))
}

fn parse_compute(pass: &mut PassHook, args: &str) -> Result<(), ParseError> {
    let toks: Vec<&str> = bytes::tokens(args).collect();
    let ints: Result<Vec<i32>, ParseError> = toks
        .iter()
        .map(|t| t.parse::<i32>().map_err(|_| ParseError::syntax(0, format!("invalid COMPUTE argument '{t}'"))))
        .collect();
    let ints = ints?;

    match ints.as_slice() {
        [bw, bh] => {
            pass.is_compute = true;
            pass.block_w = *bw;
            pass.block_h = *bh;
            pass.threads_w = 0;
            pass.threads_h = 0;
        }
        [bw, bh, tw, th] => {
            pass.is_compute = true;
            pass.block_w = *bw;
            pass.block_h = *bh;
            pass.threads_w = *tw;
            pass.threads_h = *th;
        }
        _ => return Err(ParseError::syntax(0, "COMPUTE takes 2 or 4 integers")),
    }
    Ok(())
}
