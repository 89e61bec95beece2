//! Token alphabet for the RPN size/condition expression language.

use arrayvec::ArrayVec;

/// Unary operator. `NOT` is the sole monadic operator (`spec.md` §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op1 {
    Not,
}

/// Binary arithmetic/comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op2 {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
}

/// One token of a parsed size/condition expression.
///
/// `End` is variant zero so a default-constructed `Token` (and by
/// extension a zeroed `[Token; 32]`) is a well-formed, vacuously empty
/// expression — see `spec.md` §9's "Tagged SzExp" note. In this crate
/// expressions are stored in an [`ArrayVec`] that tracks its own length,
/// so `End` tokens are never actually pushed by the parser; the variant
/// exists for format-compatibility with a fixed-array encoding and so
/// `Token::default()` has a sensible meaning.
///
/// Variable tokens own their name rather than referencing the document
/// buffer: the default `width`/`height` expressions (`HOOKED.w`,
/// `HOOKED.h`, see [`crate::pass::PassHook::default`]) name a texture
/// that never literally appears in the source text, so a back-reference
/// span would have nowhere to point.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    End,
    Const(f32),
    VarW(String),
    VarH(String),
    Op1(Op1),
    Op2(Op2),
}

impl Default for Token {
    fn default() -> Self {
        Token::End
    }
}

/// Maximum number of tokens a single size/condition expression may hold.
pub const MAX_TOKENS: usize = 32;

/// A parsed RPN expression: at most [`MAX_TOKENS`] tokens.
pub type SzExp = ArrayVec<Token, MAX_TOKENS>;

/// Build the default `cond` expression: the constant `1`.
pub fn always_true() -> SzExp {
    let mut exp = SzExp::new();
    exp.push(Token::Const(1.0));
    exp
}

/// Build a default size expression naming `HOOKED`'s given dimension.
pub fn hooked_dim(width: bool) -> SzExp {
    let mut exp = SzExp::new();
    exp.push(if width {
        Token::VarW("HOOKED".to_string())
    } else {
        Token::VarH("HOOKED".to_string())
    });
    exp
}
