//! Component E: auxiliary texture blocks, plus the runtime texture
//! records ([`HookTex`], [`PassTexture`]) the execution engine threads
//! through the dynamic pass-texture table.

use std::fmt;

use crate::bytes::{self, Span};
use crate::error::ParseError;
use crate::gpu::{AddressMode, ColorRepresentation, GpuContext, SampleMode, TextureUploadDesc};

/// A crop rectangle: origin plus size, in the units the host's
/// renderer uses for `src_rect`/`dst_rect`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn dims(&self) -> (f32, f32) {
        (self.w, self.h)
    }

    pub fn origin(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// The external renderer's "current input texture" record (`spec.md`
/// glossary: "a texture record including its source crop rectangle and
/// color representation metadata"). Dimensions reported here are the
/// full texture's, used for the `HOOKED` expression variable; the crop
/// used for `NATIVE_CROPPED`/`OUTPUT` and the binding preamble's
/// `tex_offset` travels separately as `src_rect`/`dst_rect` on
/// [`crate::engine::HookParams`], matching mpv's own plumbing where a
/// hook invocation's crop can differ pass-to-pass from the texture's
/// own intrinsic rect (see `DESIGN.md`).
///
/// `view` is an opaque handle (`spec.md` §3: "`HookTex` is the external
/// renderer's texture-with-crop-rect record") rather than a concrete
/// `wgpu::TextureView` — THE CORE only ever threads it through to the
/// `ShaderBuffer` collaborator, never dereferences it, so `Any` keeps
/// the engine exercisable in tests with no real adapter.
#[derive(Clone)]
pub struct HookTex {
    pub view: std::sync::Arc<dyn std::any::Any + Send + Sync>,
    pub width: f32,
    pub height: f32,
    pub color_repr: Box<dyn ColorRepresentation>,
}

impl HookTex {
    pub fn dims(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

// `dyn Any` carries no `Debug` impl, so this is hand-written rather
// than derived.
impl fmt::Debug for HookTex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookTex")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

const DEFAULT_TEXTURE_NAME: &str = "USER_TEX";

/// One auxiliary LUT texture (`//!TEXTURE` block), owned by the
/// [`crate::HookObject`] for its whole lifetime; destroyed alongside it.
#[derive(Debug)]
pub struct LutTexture {
    name: Option<Span>,
    pub tex: wgpu::Texture,
}

impl LutTexture {
    /// Resolve this texture's name, falling back to the default
    /// `USER_TEX` when `//!TEXTURE` never named it explicitly.
    pub fn name<'a>(&self, source: &'a str) -> &'a str {
        match self.name {
            Some(span) => span.resolve(source),
            None => DEFAULT_TEXTURE_NAME,
        }
    }
}

/// A dynamic binding entry in the engine's pass-texture table
/// (`spec.md` §3). Appended by the save path (component J) and by the
/// "implicit save" of a stage's input (component I, step 1).
#[derive(Debug, Clone)]
pub struct PassTexture {
    pub name: String,
    pub tex: HookTex,
}

/// Parameters accumulated while walking a `//!TEXTURE` block's headers,
/// before the hex payload is decoded and uploaded.
struct TextureParams {
    name: Option<Span>,
    width: u32,
    height: u32,
    depth: u32,
    format: Option<String>,
    sample_mode: SampleMode,
    address_mode: AddressMode,
    sampleable: bool,
}

impl Default for TextureParams {
    fn default() -> Self {
        TextureParams {
            name: None,
            width: 1,
            height: 1,
            depth: 0,
            format: None,
            sample_mode: SampleMode::Nearest,
            address_mode: AddressMode::Clamp,
            sampleable: true,
        }
    }
}

/// Parse one `//!TEXTURE` block starting at `block` (which must begin
/// with `//!TEXTURE`), a subslice of `source`. Returns the built
/// [`LutTexture`] and the residual document (still containing its
/// leading `//!`, per `spec.md`'s document grammar).
pub fn parse_texture_block<'a>(
    source: &str,
    block: &'a str,
    gpu: &dyn GpuContext,
) -> Result<(LutTexture, &'a str), ParseError> {
    let mut params = TextureParams::default();

    let mut rest = block;
    loop {
        let line_end = rest.find('\n').unwrap_or(rest.len());
        let line = &rest[..line_end];
        if !line.starts_with("//!") {
            break;
        }
        let header = bytes::eat_start(line, "//!");
        let (command, args) = split_command(header);

        match command {
            "TEXTURE" => params.name = Some(Span::from_subslice(source, args.trim())),
            "SIZE" => parse_size(&mut params, args, gpu)?,
            "FORMAT" => params.format = Some(args.trim().to_string()),
            "FILTER" => params.sample_mode = parse_filter(args)?,
            "BORDER" => params.address_mode = parse_border(args)?,
            other => return Err(ParseError::syntax(0, format!("unrecognized command '{other}'"))),
        }

        // An empty-slice tail of `rest`, not a literal, so everything
        // derived from `rest` below stays a valid subslice of `source`
        // even with no trailing '\n'.
        rest = if line_end < rest.len() { &rest[line_end + 1..] } else { &rest[rest.len()..] };
    }

    let (body, residual) = match bytes::find(rest, "//!") {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, &rest[rest.len()..]),
    };

    let texel_size = resolve_format(&params, gpu)?;
    let data = decode_payload(body, &params, texel_size)?;

    let desc = TextureUploadDesc {
        width: params.width,
        height: params.height,
        depth: params.depth,
        format: params.format.as_deref().unwrap_or_default(),
        sample_mode: params.sample_mode,
        address_mode: params.address_mode,
        sampleable: params.sampleable,
        data: &data,
    };
    let tex = gpu.create_texture(desc)?;

    Ok((LutTexture { name: params.name, tex }, residual))
}

fn split_command(header: &str) -> (&str, &str) {
    match header.split_once(' ') {
        Some((cmd, rest)) => (cmd, rest.trim()),
        // An empty-slice tail of `header` rather than a `&'static str` literal,
        // so it still points into `source` and `Span::from_subslice` stays valid.
        None => (header.trim(), &header[header.len()..]),
    }
}

fn parse_size(params: &mut TextureParams, args: &str, gpu: &dyn GpuContext) -> Result<(), ParseError> {
    let dims: Vec<&str> = bytes::tokens(args).collect();
    if dims.is_empty() || dims.len() > 3 {
        return Err(ParseError::semantic("SIZE requires 1 to 3 dimensions"));
    }

    let limits = [gpu.max_tex_1d_dim(), gpu.max_tex_2d_dim(), gpu.max_tex_3d_dim()];
    let limit = limits[dims.len() - 1];
    // Unused dims are cleared to 0 (`spec.md` §4.E), not left at the
    // pre-SIZE default of 1; the payload-length formula in
    // `decode_payload` clamps them back to 1 with `max(1)` as the spec
    // requires.
    let mut values = [0u32, 0, 0];
    for (i, tok) in dims.iter().enumerate() {
        let v: u32 = tok
            .parse()
            .map_err(|_| ParseError::syntax(0, format!("invalid SIZE dimension '{tok}'")))?;
        if v < 1 || v > limit {
            return Err(ParseError::semantic(format!("SIZE dimension {v} out of range")));
        }
        values[i] = v;
    }

    params.width = values[0];
    params.height = values[1];
    params.depth = values[2];
    Ok(())
}

fn parse_filter(args: &str) -> Result<SampleMode, ParseError> {
    match args.trim() {
        "LINEAR" => Ok(SampleMode::Linear),
        "NEAREST" => Ok(SampleMode::Nearest),
        other => Err(ParseError::syntax(0, format!("unknown FILTER '{other}'"))),
    }
}

fn parse_border(args: &str) -> Result<AddressMode, ParseError> {
    match args.trim() {
        "CLAMP" => Ok(AddressMode::Clamp),
        "REPEAT" => Ok(AddressMode::Repeat),
        "MIRROR" => Ok(AddressMode::Mirror),
        other => Err(ParseError::syntax(0, format!("unknown BORDER '{other}'"))),
    }
}

fn resolve_format(params: &TextureParams, gpu: &dyn GpuContext) -> Result<u32, ParseError> {
    let name = params
        .format
        .as_deref()
        .ok_or_else(|| ParseError::semantic("TEXTURE block is missing FORMAT"))?;
    let info = gpu
        .format(name)
        .ok_or_else(|| ParseError::semantic(format!("unknown format '{name}'")))?;
    if info.opaque || !info.caps.contains(crate::gpu::FormatCaps::SAMPLEABLE) {
        return Err(ParseError::semantic(format!("format '{name}' is not sampleable")));
    }
    if params.sample_mode == SampleMode::Linear && !info.caps.contains(crate::gpu::FormatCaps::LINEAR) {
        return Err(ParseError::semantic(format!("format '{name}' does not support LINEAR filtering")));
    }
    Ok(info.texel_size)
}

fn decode_payload(body: &str, params: &TextureParams, texel_size: u32) -> Result<Vec<u8>, ParseError> {
    let expected = params.width as usize
        * params.height.max(1) as usize
        * params.depth.max(1) as usize
        * texel_size as usize;

    let line = body.trim();
    let bytes = bytes::decode_hex(line)
        .ok_or_else(|| ParseError::semantic("texture payload is not valid hex"))?;
    if bytes.len() != expected {
        return Err(ParseError::semantic(format!(
            "texture payload is {} bytes, expected {expected}",
            bytes.len()
        )));
    }
    Ok(bytes)
}
