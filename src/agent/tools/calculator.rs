//! Arithmetic evaluator.
//!
//! A recursive-descent parser over numeric literals, `+ - * / // % **`,
//! unary signs, and parentheses. Names, calls, and anything else are
//! rejected. Integer arithmetic stays integral; `/` always produces a float,
//! `//` and `%` floor toward negative infinity.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '//' | '%') unary)*
//! unary  := ('+' | '-') unary | power
//! power  := atom ('**' unary)?
//! atom   := number | '(' expr ')'
//! ```

use serde_json::Value;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;

/// Maximum expression length accepted.
const MAX_EXPRESSION_LEN: usize = 1024;

/// Maximum parenthesis / unary nesting.
const MAX_DEPTH: usize = 64;

/// Evaluate arithmetic expressions.
pub struct CalculatorTool;

impl Capability for CalculatorTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "calculator".into(),
            description: "Evaluate an arithmetic expression (+ - * / // % ** and parentheses)."
                .into(),
            parameters: vec![CapabilityParam::required(
                "expression",
                "Expression to evaluate, e.g. \"(2 + 3) * 4\".",
            )],
        }
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let expression = input.require_str("expression", "calculator")?;
        Ok(match evaluate(expression) {
            Ok(number) => CapabilityResult::ok(number.to_json()),
            Err(message) => CapabilityResult::failure(message),
        })
    }
}

/// A numeric value with Python-like int/float distinction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }

    /// JSON form. Non-finite floats have no JSON number and render as text.
    pub fn to_json(self) -> Value {
        match self {
            Self::Int(i) => Value::from(i),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Evaluate `expression`, returning a failure description on error.
pub fn evaluate(expression: &str) -> Result<Number, String> {
    if expression.len() > MAX_EXPRESSION_LEN {
        return Err(format!(
            "expression too long ({} bytes, max {MAX_EXPRESSION_LEN})",
            expression.len()
        ));
    }
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("empty expression".into());
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(format!("unexpected token {tok} at position {}", parser.pos));
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Star => f.write_str("'*'"),
            Self::Slash => f.write_str("'/'"),
            Self::DoubleSlash => f.write_str("'//'"),
            Self::Percent => f.write_str("'%'"),
            Self::DoubleStar => f.write_str("'**'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_') {
                    i += 1;
                }
                // Exponent part: 1e3, 2.5E-4
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().filter(|c| **c != '_').collect();
                tokens.push(Token::Num(parse_literal(&literal)?));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::DoubleStar);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other if other.is_alphabetic() || other == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                return Err(format!("name '{name}' is not defined"));
            }
            other => return Err(format!("invalid character '{other}' at position {i}")),
        }
    }
    Ok(tokens)
}

fn parse_literal(literal: &str) -> Result<Number, String> {
    let is_float = literal.contains(['.', 'e', 'E']);
    if is_float {
        literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| format!("invalid number literal '{literal}'"))
    } else {
        literal
            .parse::<i64>()
            .map(Number::Int)
            .map_err(|_| format!("integer literal '{literal}' out of range"))
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn descend(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(format!("expression nested deeper than {MAX_DEPTH} levels"));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Number, String> {
        let mut lhs = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Number, String> {
        let mut lhs = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent)) =
            self.peek()
        {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Number, String> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let v = self.unary();
                self.depth -= 1;
                v
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let v = self.unary();
                self.depth -= 1;
                match v? {
                    Number::Int(i) => i
                        .checked_neg()
                        .map(Number::Int)
                        .ok_or_else(|| "integer overflow".to_string()),
                    Number::Float(f) => Ok(Number::Float(-f)),
                }
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Number, String> {
        let base = self.atom()?;
        if self.peek() == Some(Token::DoubleStar) {
            self.pos += 1;
            // Right-associative, and binds tighter than a unary on its left:
            // -2**2 == -4, 2**-1 == 0.5.
            self.descend()?;
            let exponent = self.unary();
            self.depth -= 1;
            return apply(Token::DoubleStar, base, exponent?);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number, String> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                self.descend()?;
                let v = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(v),
                    Some(tok) => Err(format!("expected ')' but found {tok}")),
                    None => Err("unclosed parenthesis".into()),
                }
            }
            Some(tok) => Err(format!("unexpected token {tok}")),
            None => Err("unexpected end of expression".into()),
        }
    }
}

fn apply(op: Token, lhs: Number, rhs: Number) -> Result<Number, String> {
    use Number::{Float, Int};

    let overflow = || "integer overflow".to_string();

    match op {
        Token::Plus => match (lhs, rhs) {
            (Int(a), Int(b)) => a.checked_add(b).map(Int).ok_or_else(overflow),
            _ => Ok(Float(lhs.as_f64() + rhs.as_f64())),
        },
        Token::Minus => match (lhs, rhs) {
            (Int(a), Int(b)) => a.checked_sub(b).map(Int).ok_or_else(overflow),
            _ => Ok(Float(lhs.as_f64() - rhs.as_f64())),
        },
        Token::Star => match (lhs, rhs) {
            (Int(a), Int(b)) => a.checked_mul(b).map(Int).ok_or_else(overflow),
            _ => Ok(Float(lhs.as_f64() * rhs.as_f64())),
        },
        Token::Slash => {
            if rhs.is_zero() {
                return Err("division by zero".into());
            }
            Ok(Float(lhs.as_f64() / rhs.as_f64()))
        }
        Token::DoubleSlash => {
            if rhs.is_zero() {
                return Err("integer division or modulo by zero".into());
            }
            match (lhs, rhs) {
                (Int(a), Int(b)) => floor_div(a, b).map(Int).ok_or_else(overflow),
                _ => Ok(Float((lhs.as_f64() / rhs.as_f64()).floor())),
            }
        }
        Token::Percent => {
            if rhs.is_zero() {
                return Err("integer division or modulo by zero".into());
            }
            match (lhs, rhs) {
                (Int(a), Int(b)) => a
                    .checked_rem_euclid(b)
                    .map(|r| if r != 0 && b < 0 { r + b } else { r })
                    .map(Int)
                    .ok_or_else(overflow),
                _ => {
                    let (a, b) = (lhs.as_f64(), rhs.as_f64());
                    let r = a % b;
                    Ok(Float(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }))
                }
            }
        }
        Token::DoubleStar => match (lhs, rhs) {
            (Int(a), Int(b)) if b >= 0 => {
                let exp = u32::try_from(b).map_err(|_| overflow())?;
                a.checked_pow(exp).map(Int).ok_or_else(overflow)
            }
            _ => {
                if lhs.is_zero() && rhs.as_f64() < 0.0 {
                    return Err("zero cannot be raised to a negative power".into());
                }
                let v = lhs.as_f64().powf(rhs.as_f64());
                if v.is_nan() {
                    Err("result is not a real number".into())
                } else {
                    Ok(Float(v))
                }
            }
        },
        other => Err(format!("{other} is not a binary operator")),
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> Number {
        evaluate(src).unwrap_or_else(|e| panic!("{src}: {e}"))
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(eval("2+2"), Number::Int(4));
        assert_eq!(eval("(2 + 3) * 4"), Number::Int(20));
        assert_eq!(eval("2 ** 10"), Number::Int(1024));
        assert_eq!(eval("1_000 + 1"), Number::Int(1001));
    }

    #[test]
    fn true_division_is_float() {
        assert_eq!(eval("7 / 2"), Number::Float(3.5));
        assert_eq!(eval("4 / 2"), Number::Float(2.0));
    }

    #[test]
    fn floor_semantics() {
        assert_eq!(eval("7 // 2"), Number::Int(3));
        assert_eq!(eval("-7 // 2"), Number::Int(-4));
        assert_eq!(eval("-7 % 3"), Number::Int(2));
        assert_eq!(eval("7 % -3"), Number::Int(-2));
        assert_eq!(eval("7.5 // 2"), Number::Float(3.0));
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("2 + 3 * 4"), Number::Int(14));
        assert_eq!(eval("2 ** 3 ** 2"), Number::Int(512));
        assert_eq!(eval("-2 ** 2"), Number::Int(-4));
        assert_eq!(eval("2 ** -1"), Number::Float(0.5));
        assert_eq!(eval("10 - 4 - 3"), Number::Int(3));
    }

    #[test]
    fn floats_and_exponents() {
        assert_eq!(eval("1.5 * 2"), Number::Float(3.0));
        assert_eq!(eval("1e3 + 1"), Number::Float(1001.0));
    }

    #[test]
    fn errors_are_descriptive() {
        assert_eq!(evaluate("1 / 0").unwrap_err(), "division by zero");
        assert!(evaluate("__import__('os')").unwrap_err().contains("not defined"));
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("(1 + 2").unwrap_err().contains("unclosed"));
        assert!(evaluate("1 2").unwrap_err().contains("unexpected token"));
        assert!(evaluate("").is_err());
        assert!(evaluate("9223372036854775807 + 1").unwrap_err().contains("overflow"));
        assert!(evaluate(&"(".repeat(200)).unwrap_err().contains("nested"));
    }

    #[test]
    fn capability_envelope() {
        let out = CalculatorTool
            .run(&CapabilityInput::new().with_param("expression", "2+2"))
            .unwrap();
        assert!(out.succeeded());
        assert_eq!(out.output(), &Value::from(4));

        let bad = CalculatorTool
            .run(&CapabilityInput::new().with_param("expression", "1/0"))
            .unwrap();
        assert!(!bad.succeeded());
        assert_eq!(bad.output_text(), "division by zero");
    }
}
