//! Numeric expressions for function arguments.
//!
//! A closed grammar, evaluated without any access to the walk:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | power
//! power   := primary ('^' unary)?
//! primary := number | '(' expr ')' | 'log2' '(' expr ')'
//! ```

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unexpected token at offset {0}")]
    UnexpectedToken(usize),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Result is not a finite number")]
    NotFinite,
}

#[derive(Debug, Clone, PartialEq)]
enum ExprToken {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LeftParen,
    RightParen,
}

/// Token with its byte offset in the source.
#[derive(Debug, Clone)]
struct LocatedExprToken {
    token: ExprToken,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<LocatedExprToken>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let token = match c {
            ' ' | '\t' => {
                chars.next();
                continue;
            }
            '+' => ExprToken::Plus,
            '-' => ExprToken::Minus,
            '*' => ExprToken::Star,
            '/' => ExprToken::Slash,
            '^' => ExprToken::Caret,
            '(' => ExprToken::LeftParen,
            ')' => ExprToken::RightParen,
            '0'..='9' | '.' => {
                let mut text = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnexpectedChar(c, offset))?;
                tokens.push(LocatedExprToken {
                    token: ExprToken::Number(value),
                    offset,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_alphanumeric() {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(LocatedExprToken {
                    token: ExprToken::Ident(name),
                    offset,
                });
                continue;
            }
            other => return Err(ExprError::UnexpectedChar(other, offset)),
        };
        chars.next();
        tokens.push(LocatedExprToken { token, offset });
    }

    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<LocatedExprToken>,
    position: usize,
}

impl ExprParser {
    fn current(&self) -> Option<&ExprToken> {
        self.tokens.get(self.position).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<ExprToken> {
        let token = self.tokens.get(self.position).map(|t| t.token.clone());
        self.position += 1;
        token
    }

    fn expect(&mut self, expected: ExprToken) -> Result<(), ExprError> {
        match self.tokens.get(self.position) {
            Some(t) if t.token == expected => {
                self.position += 1;
                Ok(())
            }
            Some(t) => Err(ExprError::UnexpectedToken(t.offset)),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        loop {
            match self.current() {
                Some(ExprToken::Plus) => {
                    self.advance();
                    value += self.term()?;
                }
                Some(ExprToken::Minus) => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.unary()?;
        loop {
            match self.current() {
                Some(ExprToken::Star) => {
                    self.advance();
                    value *= self.unary()?;
                }
                Some(ExprToken::Slash) => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, ExprError> {
        if self.current() == Some(&ExprToken::Minus) {
            self.advance();
            return Ok(-self.unary()?);
        }
        self.power()
    }

    fn power(&mut self) -> Result<f64, ExprError> {
        let base = self.primary()?;
        if self.current() == Some(&ExprToken::Caret) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, ExprError> {
        let offset = self.tokens.get(self.position).map(|t| t.offset);
        match self.advance() {
            Some(ExprToken::Number(value)) => Ok(value),
            Some(ExprToken::LeftParen) => {
                let value = self.expr()?;
                self.expect(ExprToken::RightParen)?;
                Ok(value)
            }
            Some(ExprToken::Ident(name)) => {
                if !name.eq_ignore_ascii_case("log2") {
                    return Err(ExprError::UnknownFunction(name));
                }
                self.expect(ExprToken::LeftParen)?;
                let value = self.expr()?;
                self.expect(ExprToken::RightParen)?;
                Ok(value.log2())
            }
            Some(_) => Err(ExprError::UnexpectedToken(offset.unwrap_or(0))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Evaluate a numeric expression.
///
/// # Example
/// ```
/// use scorewalk::expr::evaluate;
///
/// assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
/// assert_eq!(evaluate("Log2(8) - 1").unwrap(), 2.0);
/// ```
pub fn evaluate(source: &str) -> Result<f64, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = ExprParser {
        tokens,
        position: 0,
    };
    let value = parser.expr()?;
    if let Some(t) = parser.tokens.get(parser.position) {
        return Err(ExprError::UnexpectedToken(t.offset));
    }
    if !value.is_finite() {
        return Err(ExprError::NotFinite);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("8 / 2 / 2").unwrap(), 2.0);
    }

    #[test]
    fn test_log2() {
        assert_eq!(evaluate("log2(16)").unwrap(), 4.0);
        assert_eq!(evaluate("Log2(3) - Log2(3)").unwrap(), 0.0);
        assert_eq!(evaluate("2 ^ Log2(5)").unwrap().round(), 5.0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate("1 / 0"), Err(ExprError::DivisionByZero));
        assert_eq!(evaluate("1 +"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(ExprError::UnexpectedEnd));
        assert_eq!(evaluate("1 2"), Err(ExprError::UnexpectedToken(2)));
        assert_eq!(evaluate("1 $ 2"), Err(ExprError::UnexpectedChar('$', 2)));
        assert_eq!(
            evaluate("sqrt(4)"),
            Err(ExprError::UnknownFunction("sqrt".to_string()))
        );
        assert_eq!(evaluate("log2(0)"), Err(ExprError::NotFinite));
    }
}
