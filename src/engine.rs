//! Components I and J: the per-invocation execution engine and the
//! `save`/`reset` lifecycle callbacks.

use bitflags::bitflags;

use crate::error::HookError;
use crate::expr;
use crate::gpu::{ShaderBuffer, TextureIdents};
use crate::prng;
use crate::registry::HookObject;
use crate::stage::{self, Stage};
use crate::texture::{HookTex, PassTexture, Rect};

bitflags! {
    /// The status bits a `hook()` call reports back to the host
    /// (`spec.md` §6: "bit 0 = SAVE, bit 1 = AGAIN").
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HookStatus: i32 {
        const SAVE  = 1 << 0;
        const AGAIN = 1 << 1;
    }
}

impl HookStatus {
    /// The raw `i32` the C-shaped protocol expects: non-negative, with
    /// `SAVE`/`AGAIN` as the low two bits. A fatal `HookError` maps to
    /// a negative number instead — see [`to_raw_result`].
    pub fn to_raw(self) -> i32 {
        self.bits()
    }
}

/// Convert a `hook()` outcome to the raw signed protocol value
/// (`spec.md` §6: "negative = fatal, 0 = done, bit 0 = SAVE, bit 1 =
/// AGAIN").
pub fn to_raw_result(result: &Result<HookStatus, HookError>) -> i32 {
    match result {
        Ok(status) => status.to_raw(),
        Err(_) => -1,
    }
}

/// Inputs to one `hook()` invocation (`spec.md` §4.I).
pub struct HookParams<'a> {
    pub stage: Stage,
    pub tex: HookTex,
    pub src_rect: Rect,
    pub dst_rect: Rect,
    pub sh: &'a mut dyn ShaderBuffer,
    pub count: usize,
}

/// Inputs to a `save()` callback, issued after a `hook()` that
/// returned `SAVE` (`spec.md` §4.J).
pub struct SaveParams {
    pub stage: Stage,
    pub tex: HookTex,
    pub count: usize,
}

impl HookObject {
    /// Run one `hook()` invocation (`spec.md` §4.I).
    pub fn hook(&mut self, params: &mut HookParams<'_>) -> Result<HookStatus, HookError> {
        if params.count == 0 && self.save_stages.intersects(params.stage) {
            let name = stage::to_text(params.stage).to_string();
            self.pass_textures.push(PassTexture { name, tex: params.tex.clone() });
        }

        let mut total_count = 0usize;
        let mut selected = None;
        for (i, p) in self.passes.iter().enumerate() {
            if p.exec_stages.intersects(params.stage) {
                if total_count == params.count {
                    selected = Some(i);
                }
                total_count += 1;
            }
        }
        let idx = match selected {
            Some(i) => i,
            None => return Ok(HookStatus::empty()),
        };
        let hook = self.passes[idx].hook.clone();

        let cond = {
            let p: &HookParams<'_> = params;
            expr::eval(&hook.cond, |name| self.resolve_var(name, p))?
        };

        let mut ran = false;
        if cond != 0.0 {
            ran = true;

            if hook.is_compute {
                params.sh.request_compute((hook.block_w, hook.block_h))?;
            }

            let (out_w, out_h) = {
                let p: &HookParams<'_> = params;
                (
                    expr::eval(&hook.width, |name| self.resolve_var(name, p))?,
                    expr::eval(&hook.height, |name| self.resolve_var(name, p))?,
                )
            };
            params.sh.require_output((out_w, out_h), "no input")?;

            for bind in &hook.bind_tex {
                if bind.is_empty() {
                    continue;
                }
                let name = bind.resolve(&self.source).to_string();
                self.bind_one(&name, params);
            }

            self.emit_global_preamble(params);

            params.sh.append_header(hook.body.resolve(&self.source));
            let call = if hook.is_compute { "hook();" } else { "vec4 color = hook();" };
            params.sh.append_main(call);
        }

        let mut ret = HookStatus::empty();
        if ran && hook.save_tex.is_some() {
            ret |= HookStatus::SAVE;
        }
        if params.count + 1 < total_count {
            ret |= HookStatus::AGAIN;
        }
        Ok(ret)
    }

    /// After a `hook()` that returned `SAVE`, record the triggering
    /// pass's output under its declared `SAVE` name (`spec.md` §4.J).
    pub fn save(&mut self, params: &SaveParams) {
        let mut total_count = 0usize;
        let mut selected = None;
        for (i, p) in self.passes.iter().enumerate() {
            if p.exec_stages.intersects(params.stage) {
                if total_count == params.count {
                    selected = Some(i);
                }
                total_count += 1;
            }
        }
        let Some(idx) = selected else { return };
        let Some(save_name) = self.passes[idx].hook.save_tex else { return };
        let name = save_name.resolve(&self.source).to_string();
        self.pass_textures.push(PassTexture { name, tex: params.tex.clone() });
    }

    fn resolve_var(&self, name: &str, params: &HookParams<'_>) -> Option<(f32, f32)> {
        match name {
            "HOOKED" => Some(params.tex.dims()),
            "NATIVE_CROPPED" => Some(params.src_rect.dims()),
            "OUTPUT" => Some(params.dst_rect.dims()),
            other => self.pass_textures.iter().find(|pt| pt.name == other).map(|pt| pt.tex.dims()),
        }
    }

    fn bind_one(&mut self, name: &str, params: &mut HookParams<'_>) {
        if name == "HOOKED" {
            let stage_name = stage::to_text(params.stage);
            let idents = params.sh.bind_texture(&params.tex, stage_name);
            let mul = params.tex.color_repr.normalize();
            emit_preamble(params.sh, stage_name, &idents, params.src_rect.origin(), mul);
            emit_alias(params.sh, "HOOKED", stage_name);
            return;
        }

        if let Some(lut) = self.lut_textures.iter().find(|l| l.name(&self.source) == name) {
            let ident = params.sh.bind_sampled(&lut.tex, name);
            params.sh.append_header(&format!("#define {name} {ident}"));
            return;
        }

        if let Some(pt) = self.pass_textures.iter_mut().find(|pt| pt.name == name) {
            let idents = params.sh.bind_texture(&pt.tex, name);
            let mul = pt.tex.color_repr.normalize();
            emit_preamble(params.sh, name, &idents, params.src_rect.origin(), mul);
            return;
        }

        log::trace!("BIND '{name}' does not resolve to HOOKED, a LUT texture, or a saved pass texture; skipping");
    }

    fn emit_global_preamble(&mut self, params: &mut HookParams<'_>) {
        self.frame_count = self.frame_count.wrapping_add(1);
        let random = prng::next_uniform(&mut self.prng_state);

        params.sh.declare("frame", "int", true, &self.frame_count.to_string());
        params.sh.declare("random", "float", true, &format!("{random:?}"));
        params.sh.append_header(&format!(
            "#define input_size vec2({}, {})",
            params.src_rect.w, params.src_rect.h
        ));
        params.sh.append_header(&format!(
            "#define target_size vec2({}, {})",
            params.dst_rect.w, params.dst_rect.h
        ));
        params.sh.append_header(&format!(
            "#define tex_offset vec2({}, {})",
            params.src_rect.x, params.src_rect.y
        ));
    }
}

/// Emit the full per-texture binding preamble (`spec.md` §4.I) for a
/// texture bound under logical name `name`.
fn emit_preamble(sh: &mut dyn ShaderBuffer, name: &str, idents: &TextureIdents, offset: (f32, f32), mul: f32) {
    sh.append_header(&format!("#define {name}_raw {}", idents.raw));
    sh.append_header(&format!("#define {name}_pos {}", idents.pos));
    sh.append_header(&format!("#define {name}_size {}", idents.size));
    sh.append_header(&format!("#define {name}_pt {}", idents.pt));
    sh.append_header(&format!("#define {name}_off vec2({}, {})", offset.0, offset.1));
    sh.append_header(&format!("#define {name}_mul {mul}"));
    sh.append_header(&format!("#define {name}_rot mat2(1.0, 0.0, 0.0, 1.0)"));
    sh.append_header(&format!("#define {name}_tex(pos) ({name}_mul * vec4(texture({name}_raw, pos)))"));
    sh.append_header(&format!("#define {name}_texOff(off) ({name}_tex({name}_pos + {name}_pt * vec2(off)))"));
}

/// Alias every `alias_*` macro to `target`'s equivalent (`spec.md`
/// §4.I step 7: binding `HOOKED` also aliases every `HOOKED_*` macro to
/// the stage-named equivalent).
fn emit_alias(sh: &mut dyn ShaderBuffer, alias: &str, target: &str) {
    for suffix in ["raw", "pos", "size", "pt", "off", "mul", "rot"] {
        sh.append_header(&format!("#define {alias}_{suffix} {target}_{suffix}"));
    }
    sh.append_header(&format!("#define {alias}_tex(pos) {target}_tex(pos)"));
    sh.append_header(&format!("#define {alias}_texOff(off) {target}_texOff(off)"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::Span;
    use crate::expr;
    use crate::gpu::test_support::UnitColorRepr;
    use crate::pass::PassHook;
    use arrayvec::ArrayVec;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeShaderBuffer {
        header: String,
        main: String,
        compute_requested: Option<(i32, i32)>,
        output_size: Option<(f32, f32)>,
        reject_compute: bool,
    }

    impl ShaderBuffer for FakeShaderBuffer {
        fn bind_texture(&mut self, _tex: &HookTex, logical_name: &str) -> TextureIdents {
            TextureIdents {
                raw: format!("{logical_name}_RAW_IDENT"),
                pos: format!("{logical_name}_POS_IDENT"),
                size: format!("{logical_name}_SIZE_IDENT"),
                pt: format!("{logical_name}_PT_IDENT"),
            }
        }
        fn bind_sampled(&mut self, _tex: &wgpu::Texture, logical_name: &str) -> String {
            format!("{logical_name}_SAMPLED_IDENT")
        }
        fn declare(&mut self, name: &str, ty: &str, dynamic: bool, value: &str) {
            self.header.push_str(&format!("uniform {ty} {name} = {value}; // dynamic={dynamic}\n"));
        }
        fn request_compute(&mut self, workgroup: (i32, i32)) -> Result<(), crate::error::DispatchError> {
            if self.reject_compute {
                return Err(crate::error::DispatchError::ComputeRejected);
            }
            self.compute_requested = Some(workgroup);
            Ok(())
        }
        fn require_output(&mut self, size: (f32, f32), _signature: &str) -> Result<(), crate::error::DispatchError> {
            self.output_size = Some(size);
            Ok(())
        }
        fn append_header(&mut self, text: &str) {
            self.header.push_str(text);
            self.header.push('\n');
        }
        fn append_main(&mut self, text: &str) {
            self.main.push_str(text);
            self.main.push('\n');
        }
    }

    fn fake_tex(w: f32, h: f32) -> HookTex {
        HookTex {
            view: Arc::new(0u32),
            width: w,
            height: h,
            color_repr: Box::new(UnitColorRepr),
        }
    }

    fn span(source: &str, text: &str) -> Span {
        Span::from_subslice(source, text)
    }

    #[test]
    fn minimal_pass_runs_with_no_status_bits() {
        let source = "MAIN".to_string();
        let mut obj = HookObject::new(source.clone());
        let mut hook_tex = ArrayVec::new();
        hook_tex.push(span(&source, &source[0..4]));
        let pass = PassHook { hook_tex, ..PassHook::default() };
        obj.register_pass(pass);

        let mut sh = FakeShaderBuffer::default();
        let mut params = HookParams {
            stage: Stage::RGB_OVERLAY,
            tex: fake_tex(640.0, 480.0),
            src_rect: Rect::new(0.0, 0.0, 640.0, 480.0),
            dst_rect: Rect::new(0.0, 0.0, 640.0, 480.0),
            sh: &mut sh,
            count: 0,
        };
        let status = obj.hook(&mut params).unwrap();
        assert_eq!(status, HookStatus::empty());
        assert_eq!(sh.output_size, Some((640.0, 480.0)));
        assert!(sh.main.contains("vec4 color = hook();"));
    }

    #[test]
    fn condition_false_suppresses_save() {
        let source = "MAIN MID".to_string();
        let main_name = &source[0..4];
        let mid_name = &source[5..8];
        let mut obj = HookObject::new(source.clone());
        let mut hook_tex = ArrayVec::new();
        hook_tex.push(span(&source, main_name));
        let pass = PassHook {
            hook_tex,
            cond: expr::parse("0").unwrap(),
            save_tex: Some(span(&source, mid_name)),
            ..PassHook::default()
        };
        obj.register_pass(pass);

        let mut sh = FakeShaderBuffer::default();
        let mut params = HookParams {
            stage: Stage::RGB_OVERLAY,
            tex: fake_tex(640.0, 480.0),
            src_rect: Rect::new(0.0, 0.0, 640.0, 480.0),
            dst_rect: Rect::new(0.0, 0.0, 640.0, 480.0),
            sh: &mut sh,
            count: 0,
        };
        let status = obj.hook(&mut params).unwrap();
        assert!(!status.contains(HookStatus::SAVE));
        assert!(sh.main.is_empty());
    }

    #[test]
    fn multi_pass_again_chain() {
        let source = "OUTPUT".to_string();
        let mut obj = HookObject::new(source.clone());
        for _ in 0..3 {
            let mut hook_tex = ArrayVec::new();
            hook_tex.push(span(&source, &source[0..6]));
            obj.register_pass(PassHook { hook_tex, ..PassHook::default() });
        }

        let stage = Stage::OUTPUT;
        let tex = fake_tex(100.0, 100.0);
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);

        let mut sh = FakeShaderBuffer::default();
        let mut p0 = HookParams { stage, tex: tex.clone(), src_rect: rect, dst_rect: rect, sh: &mut sh, count: 0 };
        assert!(obj.hook(&mut p0).unwrap().contains(HookStatus::AGAIN));

        let mut sh = FakeShaderBuffer::default();
        let mut p1 = HookParams { stage, tex: tex.clone(), src_rect: rect, dst_rect: rect, sh: &mut sh, count: 1 };
        assert!(obj.hook(&mut p1).unwrap().contains(HookStatus::AGAIN));

        let mut sh = FakeShaderBuffer::default();
        let mut p2 = HookParams { stage, tex, src_rect: rect, dst_rect: rect, sh: &mut sh, count: 2 };
        assert_eq!(obj.hook(&mut p2).unwrap(), HookStatus::empty());
    }

    #[test]
    fn save_then_bind_round_trip() {
        let source = "LUMA MID CHROMA".to_string();
        let luma = &source[0..4];
        let mid = &source[5..8];
        let chroma = &source[9..15];
        let mut obj = HookObject::new(source.clone());

        let mut p1_hook = ArrayVec::new();
        p1_hook.push(span(&source, luma));
        obj.register_pass(PassHook {
            hook_tex: p1_hook,
            save_tex: Some(span(&source, mid)),
            ..PassHook::default()
        });

        let mut p2_hook = ArrayVec::new();
        p2_hook.push(span(&source, chroma));
        let mut p2_bind = ArrayVec::new();
        p2_bind.push(span(&source, mid));
        obj.register_pass(PassHook { hook_tex: p2_hook, bind_tex: p2_bind, ..PassHook::default() });

        let tex = fake_tex(320.0, 240.0);
        let rect = Rect::new(0.0, 0.0, 320.0, 240.0);

        let mut sh = FakeShaderBuffer::default();
        let mut params = HookParams { stage: Stage::LUMA, tex: tex.clone(), src_rect: rect, dst_rect: rect, sh: &mut sh, count: 0 };
        let status = obj.hook(&mut params).unwrap();
        assert!(status.contains(HookStatus::SAVE));

        obj.save(&SaveParams { stage: Stage::LUMA, tex: tex.clone(), count: 0 });
        assert_eq!(obj.pass_textures.len(), 1);
        assert_eq!(obj.pass_textures[0].name, "MID");

        let mut sh2 = FakeShaderBuffer::default();
        let mut params2 = HookParams { stage: Stage::CHROMA, tex, src_rect: rect, dst_rect: rect, sh: &mut sh2, count: 0 };
        obj.hook(&mut params2).unwrap();
        assert!(sh2.header.contains("MID_raw"));
    }

    #[test]
    fn compute_pass_requests_workgroup_and_bare_call() {
        let source = "MAIN".to_string();
        let mut obj = HookObject::new(source.clone());
        let mut hook_tex = ArrayVec::new();
        hook_tex.push(span(&source, &source[0..4]));
        obj.register_pass(PassHook { hook_tex, is_compute: true, block_w: 16, block_h: 16, ..PassHook::default() });

        let mut sh = FakeShaderBuffer::default();
        let mut params = HookParams {
            stage: Stage::RGB_OVERLAY,
            tex: fake_tex(640.0, 480.0),
            src_rect: Rect::new(0.0, 0.0, 640.0, 480.0),
            dst_rect: Rect::new(0.0, 0.0, 640.0, 480.0),
            sh: &mut sh,
            count: 0,
        };
        obj.hook(&mut params).unwrap();
        assert_eq!(sh.compute_requested, Some((16, 16)));
        assert!(sh.main.contains("hook();"));
        assert!(!sh.main.contains("vec4 color"));
    }

    #[test]
    fn dispatch_rejection_is_fatal() {
        let source = "MAIN".to_string();
        let mut obj = HookObject::new(source.clone());
        let mut hook_tex = ArrayVec::new();
        hook_tex.push(span(&source, &source[0..4]));
        obj.register_pass(PassHook { hook_tex, is_compute: true, block_w: 16, block_h: 16, ..PassHook::default() });

        let mut sh = FakeShaderBuffer { reject_compute: true, ..Default::default() };
        let mut params = HookParams {
            stage: Stage::RGB_OVERLAY,
            tex: fake_tex(640.0, 480.0),
            src_rect: Rect::new(0.0, 0.0, 640.0, 480.0),
            dst_rect: Rect::new(0.0, 0.0, 640.0, 480.0),
            sh: &mut sh,
            count: 0,
        };
        assert!(obj.hook(&mut params).is_err());
    }

    #[test]
    fn no_matching_pass_returns_empty_status() {
        let mut obj = HookObject::new(String::new());
        let mut sh = FakeShaderBuffer::default();
        let mut params = HookParams {
            stage: Stage::OUTPUT,
            tex: fake_tex(1.0, 1.0),
            src_rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            dst_rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            sh: &mut sh,
            count: 0,
        };
        assert_eq!(obj.hook(&mut params).unwrap(), HookStatus::empty());
    }
}
