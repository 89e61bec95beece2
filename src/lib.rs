//! Parser, compiler, and execution engine for the textual GPU
//! shader-hook format used to describe user shader passes and
//! auxiliary lookup textures against a host renderer's pipeline.
//!
//! This crate covers three tightly coupled subsystems: the document
//! parser (modules [`bytes`], [`expr`], [`pass`], [`texture`],
//! [`document`], [`stage`]), the RPN expression evaluator
//! ([`expr::eval`]), and the hook execution engine ([`engine`],
//! [`registry`]) that a surrounding renderer drives through
//! [`reset`]/[`hook`]/[`save`] at specific pipeline stages.
//!
//! THE CORE never creates a GPU device or calls into a real renderer
//! itself: both are collaborator traits ([`gpu::GpuContext`],
//! [`gpu::ShaderBuffer`]) supplied by the host, so the whole pipeline
//! can be exercised in tests with no adapter.

pub mod bytes;
pub mod document;
pub mod engine;
pub mod error;
pub mod expr;
pub mod gpu;
pub mod pass;
pub mod prng;
pub mod registry;
pub mod stage;
pub mod texture;

pub use engine::{to_raw_result, HookParams, HookStatus, SaveParams};
pub use error::{DispatchError, EvalError, HookError, ParseError};
pub use gpu::{ColorRepresentation, GpuContext, ShaderBuffer, TextureIdents};
pub use registry::HookObject;
pub use stage::Stage;
pub use texture::{HookTex, LutTexture, PassTexture, Rect};

/// Parse a shader-hook document into a reusable [`HookObject`].
///
/// On failure, logs the cause once and returns `None`, leaving no
/// residual GPU resources (`spec.md` §6): any LUT textures already
/// uploaded by earlier blocks in the same document are dropped along
/// with the partially built registry.
pub fn parse(gpu: &dyn GpuContext, shader_text: &str) -> Option<HookObject> {
    let source = shader_text.to_string();
    match document::walk(&source, gpu) {
        Ok(parsed) => {
            let mut obj = HookObject::new(source);
            for pass in parsed.passes {
                obj.register_pass(pass);
            }
            for tex in parsed.textures {
                obj.register_texture(tex);
            }
            log::trace!("parsed hook document: {} pass(es), {} texture(s)", obj.passes.len(), obj.lut_textures.len());
            Some(obj)
        }
        Err(err) => {
            log::error!("failed to parse hook document: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{FormatCaps, TextureFormatInfo, TextureUploadDesc};

    struct FakeGpu {
        formats: Vec<TextureFormatInfo>,
    }

    impl GpuContext for FakeGpu {
        fn formats(&self) -> &[TextureFormatInfo] {
            &self.formats
        }
        fn max_tex_1d_dim(&self) -> u32 {
            8192
        }
        fn max_tex_2d_dim(&self) -> u32 {
            8192
        }
        fn max_tex_3d_dim(&self) -> u32 {
            2048
        }
        fn create_texture(&self, _desc: TextureUploadDesc<'_>) -> Result<wgpu::Texture, ParseError> {
            Err(ParseError::semantic("no real GPU in unit tests"))
        }
    }

    fn gpu() -> FakeGpu {
        FakeGpu {
            formats: vec![TextureFormatInfo {
                name: "rgba8".to_string(),
                caps: FormatCaps::SAMPLEABLE | FormatCaps::LINEAR,
                texel_size: 4,
                opaque: false,
            }],
        }
    }

    #[test]
    fn minimal_document_parses_to_one_pass() {
        let source = "//!HOOK MAIN\n//!DESC identity\nvec4 hook() { return MAIN_tex(MAIN_pos); }\n";
        let obj = parse(&gpu(), source).unwrap();
        assert_eq!(obj.passes.len(), 1);
        assert_eq!(obj.stages(), Stage::RGB_OVERLAY);
    }

    #[test]
    fn garbage_input_never_panics_and_returns_none() {
        let inputs = ["", "not a hook document at all", "\0\0\0", "//!", "//!HOOK\n//!BOGUS x\n"];
        for input in inputs {
            let _ = parse(&gpu(), input);
        }
    }

    #[test]
    fn invalid_document_returns_none_and_keeps_no_state() {
        assert!(parse(&gpu(), "no header here").is_none());
    }

    #[test]
    fn save_stages_reflect_hooked_bind() {
        let source = "//!HOOK OUTPUT\n//!BIND HOOKED\nvec4 hook() { return HOOKED_tex(HOOKED_pos); }\n";
        let obj = parse(&gpu(), source).unwrap();
        assert!(obj.save_stages().contains(Stage::OUTPUT));
    }
}
