//! Component B: RPN expression parser.
//!
//! Converts one line of text (a `//!WIDTH`/`//!HEIGHT`/`//!WHEN`
//! argument) into a fixed-capacity [`SzExp`].

use super::token::{Op1, Op2, SzExp, Token, MAX_TOKENS};
use crate::bytes;
use crate::error::ParseError;

/// Parse one RPN expression line.
///
/// `spec.md` §4.B: split on ASCII space, strip, skip empties; for each
/// token try the `.w`/`.width`, `.h`/`.height` suffixes, then a
/// single-byte operator dispatch, then a numeric literal; anything else
/// fails. Extra capacity is simply unused — this crate's `SzExp` is a
/// length-tracked `ArrayVec`, so there is no literal `END` padding to
/// write.
pub fn parse(line: &str) -> Result<SzExp, ParseError> {
    let mut exp = SzExp::new();

    for (i, tok) in bytes::tokens(line).enumerate() {
        if exp.len() >= MAX_TOKENS {
            return Err(ParseError::syntax(i, format!("expression exceeds {MAX_TOKENS} tokens")));
        }

        let token = parse_token(tok)
            .ok_or_else(|| ParseError::syntax(i, format!("unrecognized token '{tok}'")))?;
        exp.push(token);
    }

    Ok(exp)
}

fn parse_token(tok: &str) -> Option<Token> {
    if let Some(rest) = strip_dim_suffix(tok, &[".width", ".w"]) {
        return Some(Token::VarW(rest.to_string()));
    }
    if let Some(rest) = strip_dim_suffix(tok, &[".height", ".h"]) {
        return Some(Token::VarH(rest.to_string()));
    }

    match tok.as_bytes()[0] {
        b'+' if tok.len() == 1 => return Some(Token::Op2(Op2::Add)),
        b'-' if tok.len() == 1 => return Some(Token::Op2(Op2::Sub)),
        b'*' if tok.len() == 1 => return Some(Token::Op2(Op2::Mul)),
        b'/' if tok.len() == 1 => return Some(Token::Op2(Op2::Div)),
        b'!' if tok.len() == 1 => return Some(Token::Op1(Op1::Not)),
        b'>' if tok.len() == 1 => return Some(Token::Op2(Op2::Gt)),
        b'<' if tok.len() == 1 => return Some(Token::Op2(Op2::Lt)),
        b'0'..=b'9' => return bytes::parse_f32(tok).map(Token::Const),
        _ => {}
    }

    None
}

/// Try each suffix in order, returning the token with the first
/// matching suffix trimmed off. Suffixes for a given dimension never
/// overlap (`.width` does not end in `.w`, since its last two bytes are
/// `th`), so the order between them is irrelevant; listed longest-first
/// for readability only.
fn strip_dim_suffix<'a>(tok: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|suf| tok.strip_suffix(suf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operators_and_dims() {
        let exp = parse("HOOKED.w 2 *").unwrap();
        assert_eq!(exp.len(), 3);
        assert_eq!(exp[0], Token::VarW("HOOKED".to_string()));
        assert_eq!(exp[1], Token::Const(2.0));
        assert_eq!(exp[2], Token::Op2(Op2::Mul));
    }

    #[test]
    fn parses_height_suffix_and_not() {
        let exp = parse("HOOKED.height !").unwrap();
        assert_eq!(exp.len(), 2);
        assert_eq!(exp[0], Token::VarH("HOOKED".to_string()));
        assert_eq!(exp[1], Token::Op1(Op1::Not));
    }

    #[test]
    fn rejects_unknown_token() {
        assert!(parse("HOOKED.w ~").is_err());
    }

    #[test]
    fn rejects_capacity_overflow() {
        let many = "1 ".repeat(33);
        assert!(parse(&many).is_err());
    }

    #[test]
    fn single_constant() {
        let exp = parse("1").unwrap();
        assert_eq!(exp.len(), 1);
        assert_eq!(exp[0], Token::Const(1.0));
    }

    #[test]
    fn rejects_unparseable_numeric_literal() {
        assert!(parse("1.2.3").is_err());
    }
}
