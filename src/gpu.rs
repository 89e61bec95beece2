//! Collaborator interfaces (`spec.md` §6): the capability surface this
//! crate requires from the surrounding GPU abstraction and renderer.
//! THE CORE never creates a `wgpu::Device`/`wgpu::Queue` itself — it is
//! handed one through [`GpuContext`] at parse time, and a per-invocation
//! [`ShaderBuffer`] at hook time. Modeling these as traits (rather than
//! concrete `wgpu` calls, the way `cuneus`'s `compute::builder` talks to
//! `wgpu::Device` directly) keeps the parser/evaluator/engine testable
//! without a real adapter.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Capability bits reported per enumerated texture format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FormatCaps: u32 {
        /// The format may be sampled with `FILTER LINEAR`.
        const LINEAR = 1 << 0;
        /// The format may be bound as a sampled texture at all.
        const SAMPLEABLE = 1 << 1;
    }
}

/// One entry of the GPU's format enumeration (`spec.md` §6).
#[derive(Debug, Clone)]
pub struct TextureFormatInfo {
    pub name: String,
    pub caps: FormatCaps,
    pub texel_size: u32,
    pub opaque: bool,
}

/// `//!FILTER` sample mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    Linear,
    Nearest,
}

/// `//!BORDER` address mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Clamp,
    Repeat,
    Mirror,
}

/// Everything needed to create and upload one LUT texture.
pub struct TextureUploadDesc<'a> {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: &'a str,
    pub sample_mode: SampleMode,
    pub address_mode: AddressMode,
    pub sampleable: bool,
    pub data: &'a [u8],
}

/// The GPU abstraction's capability surface, as consumed during
/// construction (component E: texture block parsing).
pub trait GpuContext {
    fn formats(&self) -> &[TextureFormatInfo];
    fn max_tex_1d_dim(&self) -> u32;
    fn max_tex_2d_dim(&self) -> u32;
    fn max_tex_3d_dim(&self) -> u32;

    /// Look up one format by exact name.
    fn format(&self, name: &str) -> Option<&TextureFormatInfo> {
        self.formats().iter().find(|f| f.name == name)
    }

    /// Upload `desc` and return an opaque owned texture handle.
    fn create_texture(&self, desc: TextureUploadDesc<'_>) -> Result<wgpu::Texture, crate::error::ParseError>;
}

/// Identifiers the shader-buffer collaborator hands back for a texture
/// bound under the full per-texture preamble (`spec.md` §4.I).
#[derive(Debug, Clone)]
pub struct TextureIdents {
    pub raw: String,
    pub pos: String,
    pub size: String,
    pub pt: String,
}

/// The per-invocation shader-assembly surface (`spec.md` §6: "Shader
/// buffer"). One instance is handed to the engine for the duration of a
/// single `hook()` call.
pub trait ShaderBuffer {
    /// Bind a [`HookTex`](crate::texture::HookTex) and return the
    /// identifiers used to build the `N_raw`/`N_pos`/`N_size`/`N_pt`
    /// macros.
    fn bind_texture(&mut self, tex: &crate::texture::HookTex, logical_name: &str) -> TextureIdents;
    /// Bind a LUT texture as a plain sampled descriptor, returning its
    /// identifier (used directly as the `#define <name> <ident>` body).
    fn bind_sampled(&mut self, tex: &wgpu::Texture, logical_name: &str) -> String;
    /// Declare a typed uniform, optionally marked `dynamic` (recomputed
    /// every invocation rather than cached), carrying this invocation's
    /// value as a GLSL literal expression.
    fn declare(&mut self, name: &str, ty: &str, dynamic: bool, value: &str);
    /// Request compute-mode dispatch with the given workgroup size.
    fn request_compute(&mut self, workgroup: (i32, i32)) -> Result<(), crate::error::DispatchError>;
    /// Require the pass's output to have the given size, under `signature`.
    fn require_output(&mut self, size: (f32, f32), signature: &str) -> Result<(), crate::error::DispatchError>;
    /// Append GLSL text to the shader's header (declarations) section.
    fn append_header(&mut self, text: &str);
    /// Append GLSL text to the shader's main-function section.
    fn append_main(&mut self, text: &str);
}

/// The color-representation helper (`spec.md` §6: "Color repr helper").
/// `normalize` is side-effectful (it may e.g. fold a limited-range
/// adjustment into the representation) and returns the multiplicative
/// scale the engine writes into the `N_mul` macro.
pub trait ColorRepresentation: fmt::Debug {
    fn normalize(&mut self) -> f32;
    fn clone_box(&self) -> Box<dyn ColorRepresentation>;
}

impl Clone for Box<dyn ColorRepresentation> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
