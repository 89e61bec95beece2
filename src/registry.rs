//! Component H: the hook registry and the [`HookObject`] aggregate it
//! builds up (`spec.md` §3, §4.H).

use crate::pass::PassHook;
use crate::stage::{self, Stage};
use crate::texture::{LutTexture, PassTexture};
use crate::prng;

/// A registered pass plus its precomputed stage membership.
#[derive(Debug, Clone)]
pub struct RegisteredPass {
    pub exec_stages: Stage,
    pub hook: PassHook,
}

/// The parsed, reusable hook object a renderer drives through
/// `reset`/`hook`/`save` (`spec.md` §3). Immutable after construction
/// except for `pass_textures`, `frame_count`, and `prng_state`.
#[derive(Debug)]
pub struct HookObject {
    pub(crate) source: String,
    pub(crate) passes: Vec<RegisteredPass>,
    pub(crate) lut_textures: Vec<LutTexture>,
    pub(crate) save_stages: Stage,
    pub(crate) stages: Stage,
    pub(crate) pass_textures: Vec<PassTexture>,
    pub(crate) frame_count: i32,
    pub(crate) prng_state: [u64; 4],
}

impl HookObject {
    pub(crate) fn new(source: String) -> Self {
        HookObject {
            source,
            passes: Vec::new(),
            lut_textures: Vec::new(),
            save_stages: Stage::empty(),
            stages: Stage::empty(),
            pass_textures: Vec::new(),
            frame_count: 0,
            prng_state: prng::SEED,
        }
    }

    /// Register one parsed pass, folding its stage membership into
    /// `exec_stages`/`save_stages`/`stages` (`spec.md` §4.H).
    pub(crate) fn register_pass(&mut self, hook: PassHook) {
        let exec_stages = hook
            .hook_tex
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| stage::from_text(s.resolve(&self.source)))
            .fold(Stage::empty(), |acc, s| acc | s);

        let mut binds_hooked = false;
        let mut bind_stage_union = Stage::empty();
        for b in &hook.bind_tex {
            let name = b.resolve(&self.source);
            bind_stage_union |= stage::from_text(name);
            if name == "HOOKED" {
                binds_hooked = true;
            }
        }

        self.save_stages |= bind_stage_union;
        if binds_hooked {
            self.save_stages |= exec_stages;
        }

        self.passes.push(RegisteredPass { exec_stages, hook });
        self.recompute_stages();
    }

    /// Register one parsed LUT texture (`spec.md` §4.H: "Registering a
    /// LUT texture appends it").
    pub(crate) fn register_texture(&mut self, tex: LutTexture) {
        self.lut_textures.push(tex);
    }

    fn recompute_stages(&mut self) {
        let mut stages = self.save_stages;
        for pass in &self.passes {
            stages |= pass.exec_stages;
        }
        self.stages = stages;
    }

    /// The union of every pass's `exec_stages` and `save_stages`; the
    /// host uses this to know which stages to invoke the hook at.
    pub fn stages(&self) -> Stage {
        self.stages
    }

    /// The set of stages whose output any pass wishes to bind; the
    /// host uses this to know which stage outputs it must make
    /// available for implicit save (`spec.md` §3, §4.I step 1).
    pub fn save_stages(&self) -> Stage {
        self.save_stages
    }

    /// Clear `pass_textures`. `frame_count` and `prng_state` persist
    /// across frames (`spec.md` §4.J "Reset").
    pub fn reset(&mut self) {
        self.pass_textures.clear();
    }
}
