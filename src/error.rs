//! Error types for the hook-pass parser, evaluator, and execution engine.
//!
//! Modeled on `cuneus::ply::PlyError`: a plain enum, a hand-written
//! `Display`, and `From` impls for composing the smaller error kinds into
//! the larger ones, rather than pulling in `thiserror` for a handful of
//! variants.

use std::fmt;

/// A failure while parsing the document (component D/E/F) or an RPN
/// expression (component B). Corresponds to `spec.md` §7's `ParseSyntax`
/// and `ParseSemantic` kinds; both are fatal during construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Unrecognized command, malformed numeric literal, fixed-capacity
    /// overflow, or an otherwise structurally invalid document.
    Syntax { offset: usize, message: String },
    /// Well-formed syntactically but rejected by GPU-capability checks:
    /// unknown format, non-sampleable format, filter/format mismatch,
    /// size-limit violation, hex payload length mismatch.
    Semantic { message: String },
}

impl ParseError {
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax { offset, message: message.into() }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        ParseError::Semantic { message: message.into() }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax { offset, message } => {
                write!(f, "syntax error at byte {offset}: {message}")
            }
            ParseError::Semantic { message } => write!(f, "semantic error: {message}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A failure while evaluating an RPN expression against a variable
/// lookup (component C). Corresponds to `spec.md` §7's `EvalUnderflow /
/// EvalNonFinite / EvalMalformed` kinds, plus an unknown-variable kind
/// for a lookup miss.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// An operator was applied to fewer operands than it needs.
    Underflow,
    /// An operator produced a non-finite result (division by zero, etc).
    NonFinite,
    /// The stack did not contain exactly one value at termination.
    Malformed,
    /// A `VAR_W`/`VAR_H` token named a texture the lookup does not know.
    UnknownVariable(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Underflow => write!(f, "stack underflow"),
            EvalError::NonFinite => write!(f, "illegal operation (non-finite result)"),
            EvalError::Malformed => write!(f, "malformed stack at end of expression"),
            EvalError::UnknownVariable(name) => write!(f, "unknown variable '{name}'"),
        }
    }
}

impl std::error::Error for EvalError {}

/// A failure from the shader-buffer collaborator at dispatch time
/// (`spec.md` §7's `DispatchFailure`): the host refused compute mode or
/// an output-size requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    ComputeRejected,
    SizeRejected,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::ComputeRejected => write!(f, "shader buffer refused compute mode"),
            DispatchError::SizeRejected => write!(f, "shader buffer refused output size"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// The union of everything that can fail inside a single `hook()` call.
/// A fatal `HookError` maps to a negative return value in the raw
/// `i32`-shaped protocol (`spec.md` §6).
#[derive(Debug, Clone, PartialEq)]
pub enum HookError {
    Eval(EvalError),
    Dispatch(DispatchError),
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::Eval(e) => write!(f, "{e}"),
            HookError::Dispatch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for HookError {}

impl From<EvalError> for HookError {
    fn from(e: EvalError) -> Self {
        HookError::Eval(e)
    }
}

impl From<DispatchError> for HookError {
    fn from(e: DispatchError) -> Self {
        HookError::Dispatch(e)
    }
}
