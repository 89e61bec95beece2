//! Component C: RPN evaluator.
//!
//! Runs a parsed [`SzExp`] against a variable-lookup callback. The
//! lookup models the engine's dynamic pass-texture table plus the
//! reserved `HOOKED`/`NATIVE_CROPPED`/`OUTPUT` names (`spec.md` §4.I
//! step 4); here it is just `Fn(&str) -> Option<(f32, f32)>` so the
//! evaluator can be unit-tested with no engine or GPU collaborator at
//! all.

use super::token::{Op1, Op2, SzExp, Token};
use crate::error::EvalError;
use arrayvec::ArrayVec;

/// Evaluate `exp` against `lookup`. Returns the single value left on
/// the stack, or the first [`EvalError`] encountered.
pub fn eval(exp: &SzExp, lookup: impl Fn(&str) -> Option<(f32, f32)>) -> Result<f32, EvalError> {
    let mut stack: ArrayVec<f32, 32> = ArrayVec::new();

    for token in exp {
        match token {
            Token::End => break,
            Token::Const(v) => stack.push(*v),
            Token::VarW(name) => {
                let (w, _h) = lookup(name).ok_or_else(|| EvalError::UnknownVariable(name.clone()))?;
                stack.push(w);
            }
            Token::VarH(name) => {
                let (_w, h) = lookup(name).ok_or_else(|| EvalError::UnknownVariable(name.clone()))?;
                stack.push(h);
            }
            Token::Op1(op) => {
                let x = stack.pop().ok_or(EvalError::Underflow)?;
                let result = apply_op1(*op, x);
                check_finite(result)?;
                stack.push(result);
            }
            Token::Op2(op) => {
                let right = stack.pop().ok_or(EvalError::Underflow)?;
                let left = stack.pop().ok_or(EvalError::Underflow)?;
                let result = apply_op2(*op, left, right);
                check_finite(result)?;
                stack.push(result);
            }
        }
        // `exp` holds at most 32 tokens and every token pushes at most
        // one value, so `stack` (capacity 32) can never actually
        // overflow here; this is an invariant of the parser, not
        // something this loop needs to check.
    }

    match stack.len() {
        1 => Ok(stack[0]),
        _ => Err(EvalError::Malformed),
    }
}

fn apply_op1(op: Op1, x: f32) -> f32 {
    match op {
        Op1::Not => {
            if x == 0.0 {
                1.0
            } else {
                0.0
            }
        }
    }
}

fn apply_op2(op: Op2, left: f32, right: f32) -> f32 {
    match op {
        Op2::Add => left + right,
        Op2::Sub => left - right,
        Op2::Mul => left * right,
        Op2::Div => left / right,
        Op2::Gt => {
            if left > right {
                1.0
            } else {
                0.0
            }
        }
        Op2::Lt => {
            if left < right {
                1.0
            } else {
                0.0
            }
        }
    }
}

fn check_finite(v: f32) -> Result<(), EvalError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(EvalError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;

    #[test]
    fn constant_evaluates_to_itself() {
        let exp = parse("1").unwrap();
        assert_eq!(eval(&exp, |_| None), Ok(1.0));
    }

    #[test]
    fn width_times_two() {
        let exp = parse("HOOKED.w 2 *").unwrap();
        let got = eval(&exp, |name| (name == "HOOKED").then_some((640.0, 480.0)));
        assert_eq!(got, Ok(1280.0));
    }

    #[test]
    fn division_by_zero_is_non_finite() {
        let exp = parse("1 0 /").unwrap();
        assert_eq!(eval(&exp, |_| None), Err(EvalError::NonFinite));
    }

    #[test]
    fn underflow_on_missing_operand() {
        let exp = parse("+").unwrap();
        assert_eq!(eval(&exp, |_| None), Err(EvalError::Underflow));
    }

    #[test]
    fn malformed_when_stack_not_singleton() {
        let exp = parse("1 2").unwrap();
        assert_eq!(eval(&exp, |_| None), Err(EvalError::Malformed));
    }

    #[test]
    fn unknown_variable_fails() {
        let exp = parse("MISSING.w").unwrap();
        assert_eq!(eval(&exp, |_| None), Err(EvalError::UnknownVariable("MISSING".to_string())));
    }

    #[test]
    fn not_operator_semantics() {
        let exp = parse("0 !").unwrap();
        assert_eq!(eval(&exp, |_| None), Ok(1.0));

        let exp = parse("5 !").unwrap();
        assert_eq!(eval(&exp, |_| None), Ok(0.0));
    }

    #[test]
    fn comparisons() {
        let exp = parse("3 2 >").unwrap();
        assert_eq!(eval(&exp, |_| None), Ok(1.0));

        let exp = parse("3 2 <").unwrap();
        assert_eq!(eval(&exp, |_| None), Ok(0.0));
    }
}
