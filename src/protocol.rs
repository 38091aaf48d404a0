//! Calculator text protocol parser and response generator.
//!
//! Implements parsing for the line-oriented calculator commands:
//! - `add <a> <b>`
//! - `sub <a> <b>`
//! - `mul <a> <b>`
//!
//! One request per line, one response per line. Operands are decimal
//! 32-bit signed integers.

use bytes::BytesMut;
use std::num::ParseIntError;

/// Parsed calculator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add two operands.
    Add(i32, i32),
    /// Subtract the second operand from the first.
    Sub(i32, i32),
    /// Multiply two operands.
    Mul(i32, i32),
}

impl Command {
    /// Evaluate the command with 32-bit wrapping semantics.
    pub fn eval(&self) -> i32 {
        match *self {
            Command::Add(a, b) => a.wrapping_add(b),
            Command::Sub(a, b) => a.wrapping_sub(b),
            Command::Mul(a, b) => a.wrapping_mul(b),
        }
    }
}

/// Protocol parsing errors.
///
/// The variants separate the two failure modes the session handles
/// differently: an unknown operator is answered on the wire and the
/// session continues, while a known operator with a missing or
/// non-numeric operand is fatal and ends the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Operator is not in the supported set. The empty line lands here
    /// as an unknown (empty) operator.
    UnknownOperation(String),
    /// A known operator arrived with fewer than two operands.
    MissingOperand { op: String },
    /// An operand is not a decimal 32-bit integer.
    InvalidOperand {
        op: String,
        token: String,
        source: ParseIntError,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnknownOperation(op) => write!(f, "Unknown operation: {}", op),
            ParseError::MissingOperand { op } => {
                write!(f, "Operation '{}' requires two operands", op)
            }
            ParseError::InvalidOperand { op, token, source } => {
                write!(f, "Invalid operand '{}' for '{}': {}", token, op, source)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one command line.
///
/// The line is split into at most three space-separated tokens:
/// operator, operand A, operand B. Anything past the second operand
/// stays glued to it and fails operand parsing.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let mut tokens = line.splitn(3, ' ');
    let op = tokens.next().unwrap_or("");

    match op {
        "add" | "sub" | "mul" => {}
        _ => return Err(ParseError::UnknownOperation(op.to_string())),
    }

    let a = parse_operand(op, tokens.next())?;
    let b = parse_operand(op, tokens.next())?;

    Ok(match op {
        "add" => Command::Add(a, b),
        "sub" => Command::Sub(a, b),
        "mul" => Command::Mul(a, b),
        _ => unreachable!(),
    })
}

/// Parse a single operand token as a decimal i32.
fn parse_operand(op: &str, token: Option<&str>) -> Result<i32, ParseError> {
    let token = token.ok_or_else(|| ParseError::MissingOperand { op: op.to_string() })?;

    token.parse().map_err(|source| ParseError::InvalidOperand {
        op: op.to_string(),
        token: token.to_string(),
        source,
    })
}

/// Response generator for the calculator protocol.
pub struct Response;

impl Response {
    /// Prompt sent once when a client connects.
    ///
    /// Kept verbatim from the original exercise, unbalanced parenthesis
    /// included.
    pub fn prompt() -> &'static [u8] {
        b"Please, give me an operation to perform ([OP] [A] [B]\n"
    }

    /// Generate a result line.
    pub fn result(value: i32) -> BytesMut {
        let mut response = BytesMut::new();
        response.extend_from_slice(format!("{{The result is: {}}}\n", value).as_bytes());
        response
    }

    /// Rejection line for an unrecognized operator.
    pub fn rejection() -> &'static [u8] {
        b"Nope bro :/\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        match parse("add 2 3") {
            Ok(Command::Add(2, 3)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_sub() {
        match parse("sub 10 4") {
            Ok(Command::Sub(10, 4)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_mul() {
        match parse("mul 6 7") {
            Ok(Command::Mul(6, 7)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_negative_operands() {
        match parse("add -2 -3") {
            Ok(Command::Add(-2, -3)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_operation() {
        match parse("div 4 2") {
            Err(ParseError::UnknownOperation(op)) => assert_eq!(op, "div"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_line_is_unknown_operation() {
        match parse("") {
            Err(ParseError::UnknownOperation(op)) => assert_eq!(op, ""),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_operand() {
        match parse("add 2") {
            Err(ParseError::MissingOperand { op }) => assert_eq!(op, "add"),
            other => panic!("unexpected: {:?}", other),
        }

        match parse("mul") {
            Err(ParseError::MissingOperand { op }) => assert_eq!(op, "mul"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalid_operand() {
        match parse("add x 3") {
            Err(ParseError::InvalidOperand { op, token, .. }) => {
                assert_eq!(op, "add");
                assert_eq!(token, "x");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_extra_tokens_fail_second_operand() {
        // The third token absorbs the rest of the line, so a fourth
        // word makes the second operand non-numeric.
        match parse("add 1 2 3") {
            Err(ParseError::InvalidOperand { token, .. }) => assert_eq!(token, "2 3"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_operand_out_of_range() {
        match parse("add 2147483648 0") {
            Err(ParseError::InvalidOperand { token, .. }) => {
                assert_eq!(token, "2147483648");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_eval() {
        assert_eq!(Command::Add(2, 3).eval(), 5);
        assert_eq!(Command::Sub(10, 4).eval(), 6);
        assert_eq!(Command::Mul(6, 7).eval(), 42);
    }

    #[test]
    fn test_eval_wraps_on_overflow() {
        assert_eq!(Command::Add(i32::MAX, 1).eval(), i32::MIN);
        assert_eq!(Command::Sub(i32::MIN, 1).eval(), i32::MAX);
        assert_eq!(Command::Mul(i32::MAX, 2).eval(), -2);
    }

    #[test]
    fn test_response_result() {
        assert_eq!(&Response::result(5)[..], b"{The result is: 5}\n");
        assert_eq!(&Response::result(-12)[..], b"{The result is: -12}\n");
    }

    #[test]
    fn test_response_fixed_lines() {
        assert_eq!(
            Response::prompt(),
            b"Please, give me an operation to perform ([OP] [A] [B]\n"
        );
        assert_eq!(Response::rejection(), b"Nope bro :/\n");
    }
}
