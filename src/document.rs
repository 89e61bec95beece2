//! Component F: document dispatcher.

use crate::bytes;
use crate::error::ParseError;
use crate::gpu::GpuContext;
use crate::pass::{self, PassHook};
use crate::texture::{self, LutTexture};

/// Everything recovered from one successful walk of a document
/// (`spec.md` §4.F): every pass and every auxiliary texture, in
/// registration order.
pub struct Parsed {
    pub passes: Vec<PassHook>,
    pub textures: Vec<LutTexture>,
}

/// Walk `source`, routing each `//!` block to the pass parser
/// (component D) or the texture-block parser (component E). Fails the
/// whole parse on the first block failure.
pub fn walk(source: &str, gpu: &dyn GpuContext) -> Result<Parsed, ParseError> {
    let start = bytes::find(source, "//!")
        .ok_or_else(|| ParseError::syntax(0, "document contains no //! header"))?;
    let mut rest = &source[start..];

    let mut passes = Vec::new();
    let mut textures = Vec::new();

    while !rest.is_empty() {
        if is_texture_block(rest) {
            let (lut, residual) = texture::parse_texture_block(source, rest, gpu)?;
            textures.push(lut);
            rest = residual;
        } else {
            let (hook, residual) = pass::parse_pass_block(source, rest)?;
            passes.push(hook);
            rest = residual;
        }
    }

    Ok(Parsed { passes, textures })
}

fn is_texture_block(block: &str) -> bool {
    let line_end = block.find('\n').unwrap_or(block.len());
    let line = &block[..line_end];
    let header = bytes::eat_start(line, "//!");
    let command = header.split(' ').next().unwrap_or("");
    command == "TEXTURE"
}
