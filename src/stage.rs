//! Component G: stage name mapping.
//!
//! `Stage` is the fixed 15-member bitset of pipeline stages the
//! surrounding renderer can invoke a hook at. Text names used in
//! `//!HOOK <name>` and `//!BIND <name>` lines map onto single-bit
//! members of this set; two legacy spellings, `MAINPRESUB` and
//! `MAIN`, are accepted as aliases of the canonical `NATIVE` and
//! `RGB_OVERLAY` members respectively but are not themselves canonical
//! — `to_text` only ever produces the 15 canonical spellings.
//!
//! `MAINPRESUB` resolves to `NATIVE` rather than to the separate `RGB`
//! member: `NATIVE` is already one of the 15 canonical names (its
//! `(post-presub)` gloss describes what that stage's data represents —
//! RGB after the subtitle-overlay step — not a second stage named
//! `RGB` that `MAINPRESUB` redirects to instead.

use bitflags::bitflags;

bitflags! {
    /// One bit per pipeline stage the host may invoke a hook at.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Stage: u16 {
        const RGB            = 1 << 0;
        const LUMA           = 1 << 1;
        const CHROMA         = 1 << 2;
        const ALPHA          = 1 << 3;
        const XYZ            = 1 << 4;
        const CHROMA_SCALED  = 1 << 5;
        const ALPHA_SCALED   = 1 << 6;
        const NATIVE         = 1 << 7;
        const RGB_OVERLAY    = 1 << 8;
        const LINEAR         = 1 << 9;
        const SIGMOID        = 1 << 10;
        const PREKERNEL      = 1 << 11;
        const POSTKERNEL     = 1 << 12;
        const SCALED         = 1 << 13;
        const OUTPUT         = 1 << 14;
    }
}

/// Resolve a `//!HOOK`/`//!BIND` textual stage name to the flag it
/// represents. Unknown names resolve to the empty set (`spec.md` §4.G:
/// "Unknown names map to the empty stage set (no-op at hook time)").
pub fn from_text(name: &str) -> Stage {
    match name {
        "RGB" => Stage::RGB,
        "LUMA" => Stage::LUMA,
        "CHROMA" => Stage::CHROMA,
        "ALPHA" => Stage::ALPHA,
        "XYZ" => Stage::XYZ,
        "CHROMA_SCALED" => Stage::CHROMA_SCALED,
        "ALPHA_SCALED" => Stage::ALPHA_SCALED,
        "NATIVE" | "MAINPRESUB" => Stage::NATIVE,
        "MAIN" => Stage::RGB_OVERLAY,
        "RGB_OVERLAY" => Stage::RGB_OVERLAY,
        "LINEAR" => Stage::LINEAR,
        "SIGMOID" => Stage::SIGMOID,
        "PREKERNEL" => Stage::PREKERNEL,
        "POSTKERNEL" => Stage::POSTKERNEL,
        "SCALED" => Stage::SCALED,
        "OUTPUT" => Stage::OUTPUT,
        _ => Stage::empty(),
    }
}

/// The canonical text spelling of a single-bit stage. Panics only if
/// asked for the name of something other than one of the 15 canonical
/// single-bit members — callers always invoke this with a single
/// runtime stage, never a union.
pub fn to_text(stage: Stage) -> &'static str {
    match stage {
        Stage::RGB => "RGB",
        Stage::LUMA => "LUMA",
        Stage::CHROMA => "CHROMA",
        Stage::ALPHA => "ALPHA",
        Stage::XYZ => "XYZ",
        Stage::CHROMA_SCALED => "CHROMA_SCALED",
        Stage::ALPHA_SCALED => "ALPHA_SCALED",
        Stage::NATIVE => "NATIVE",
        Stage::RGB_OVERLAY => "RGB_OVERLAY",
        Stage::LINEAR => "LINEAR",
        Stage::SIGMOID => "SIGMOID",
        Stage::PREKERNEL => "PREKERNEL",
        Stage::POSTKERNEL => "POSTKERNEL",
        Stage::SCALED => "SCALED",
        Stage::OUTPUT => "OUTPUT",
        _ => "",
    }
}
