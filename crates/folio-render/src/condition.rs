//! Condition expressions.
//!
//! A small expression language for conditional modifiers (`if gold > 5`) and
//! conditional variable assignments:
//!
//! ```text
//! expr       := or
//! or         := and (("or" | "||") and)*
//! and        := comparison (("and" | "&&") comparison)*
//! comparison := unary (("==" | "!=" | "<" | "<=" | ">" | ">=") unary)?
//! unary      := ("!" | "not") unary | atom
//! atom       := number | string | "true" | "false" | "null" | identifier | "(" expr ")"
//! ```
//!
//! Identifiers are looked up by name (dots allowed, e.g. `player.name`); unknown
//! names evaluate to `null`. Parentheses and negations may nest at most
//! [`MAX_DEPTH`] levels.

use std::cmp::Ordering;

use serde_json::Value;

/// Condition parse error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    /// Input ended where an operand was expected.
    #[error("unexpected end of condition")]
    UnexpectedEnd,
    /// A token appeared where it is not allowed.
    #[error("unexpected '{token}' at offset {offset}")]
    UnexpectedToken {
        /// Offending token text.
        token: String,
        /// Byte offset in the condition.
        offset: usize,
    },
    /// A string literal was not closed.
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    /// Parentheses or negations nest deeper than [`MAX_DEPTH`].
    #[error("condition nests too deeply at offset {offset}")]
    TooDeep {
        /// Byte offset of the token that crossed the limit.
        offset: usize,
    },
}

/// Maximum nesting of `(` and `!` in a condition.
pub const MAX_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    Open,
    Close,
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Literal(Value),
    Var(String),
    Not(Box<Expr>),
    All(Vec<Expr>),
    Any(Vec<Expr>),
    Compare(&'static str, Box<Expr>, Box<Expr>),
}

/// A parsed condition, ready to evaluate against variable state.
///
/// # Example
///
/// ```
/// use folio_render::Condition;
/// use serde_json::json;
///
/// let condition = Condition::parse("gold >= 5 and not cursed").unwrap();
/// let lookup = |name: &str| match name {
///     "gold" => Some(json!(7)),
///     _ => None,
/// };
///
/// assert!(condition.evaluate(&lookup));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    expr: Expr,
}

impl Condition {
    /// Parse a condition.
    ///
    /// # Errors
    ///
    /// Returns [`ConditionError`] for malformed input.
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.or()?;
        if let Some((token, offset)) = parser.tokens.get(parser.pos) {
            return Err(ConditionError::UnexpectedToken {
                token: token.describe(),
                offset: *offset,
            });
        }
        Ok(Self { expr })
    }

    /// Evaluate to a boolean using `lookup` to resolve identifiers.
    pub fn evaluate(&self, lookup: &dyn Fn(&str) -> Option<Value>) -> bool {
        is_truthy(&eval(&self.expr, lookup))
    }
}

/// Truthiness of a value: null, false, 0, "" and empty arrays are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Str(s) => format!("\"{s}\""),
            Self::Ident(name) => name.clone(),
            Self::Op(op) => (*op).to_owned(),
            Self::Open => "(".to_owned(),
            Self::Close => ")".to_owned(),
        }
    }
}

const OPERATORS: [&str; 10] = ["==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "="];

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ConditionError> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        match c {
            b'(' => {
                tokens.push((Token::Open, start));
                i += 1;
            }
            b')' => {
                tokens.push((Token::Close, start));
                i += 1;
            }
            b'"' | b'\'' => {
                let rest = &source[i + 1..];
                let end = rest
                    .find(c as char)
                    .ok_or(ConditionError::UnterminatedString(start))?;
                tokens.push((Token::Str(rest[..end].to_owned()), start));
                i += end + 2;
            }
            b'0'..=b'9' | b'-' if c != b'-' || bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                i += 1;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let text = &source[start..i];
                let number = text.parse().map_err(|_| ConditionError::UnexpectedToken {
                    token: text.to_owned(),
                    offset: start,
                })?;
                tokens.push((Token::Number(number), start));
            }
            c if c.is_ascii_alphabetic() || c == b'_' || c == b'$' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'$' | b'.'))
                {
                    i += 1;
                }
                let word = &source[start..i];
                let token = match word {
                    "and" => Token::Op("&&"),
                    "or" => Token::Op("||"),
                    "not" => Token::Op("!"),
                    _ => Token::Ident(word.to_owned()),
                };
                tokens.push((token, start));
            }
            _ => {
                let rest = &source[i..];
                let op = OPERATORS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .ok_or_else(|| ConditionError::UnexpectedToken {
                        token: rest.chars().next().map(String::from).unwrap_or_default(),
                        offset: start,
                    })?;
                i += op.len();
                // A lone `=` reads as equality, as authors tend to write it.
                let op: &'static str = if *op == "=" { "==" } else { op };
                tokens.push((Token::Op(op), start));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some((Token::Op(op), _)) => Some(*op),
            _ => None,
        }
    }

    // Chains are kept flat so long `a and b and ...` runs stay shallow.
    fn or(&mut self) -> Result<Expr, ConditionError> {
        let mut terms = vec![self.and()?];
        while self.peek_op() == Some("||") {
            self.pos += 1;
            terms.push(self.and()?);
        }
        Ok(collapse(terms, Expr::Any))
    }

    fn and(&mut self) -> Result<Expr, ConditionError> {
        let mut terms = vec![self.comparison()?];
        while self.peek_op() == Some("&&") {
            self.pos += 1;
            terms.push(self.comparison()?);
        }
        Ok(collapse(terms, Expr::All))
    }

    fn comparison(&mut self) -> Result<Expr, ConditionError> {
        let left = self.unary()?;
        match self.peek_op() {
            Some(op @ ("==" | "!=" | "<" | "<=" | ">" | ">=")) => {
                self.pos += 1;
                let right = self.unary()?;
                Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
            }
            _ => Ok(left),
        }
    }

    /// Enter one nesting level for the token at `offset`.
    fn descend(&mut self, offset: usize) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ConditionError::TooDeep { offset });
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<Expr, ConditionError> {
        let tokens = self.tokens;
        if let Some((Token::Op("!"), offset)) = tokens.get(self.pos) {
            self.descend(*offset)?;
            self.pos += 1;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, ConditionError> {
        let tokens = self.tokens;
        let (token, offset) = tokens.get(self.pos).ok_or(ConditionError::UnexpectedEnd)?;
        self.pos += 1;

        match token {
            Token::Number(n) => Ok(Expr::Literal(
                serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            )),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s.clone()))),
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Var(name.clone()),
            }),
            Token::Open => {
                self.descend(*offset)?;
                let inner = self.or()?;
                self.depth -= 1;
                match self.tokens.get(self.pos) {
                    Some((Token::Close, _)) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some((token, offset)) => Err(ConditionError::UnexpectedToken {
                        token: token.describe(),
                        offset: *offset,
                    }),
                    None => Err(ConditionError::UnexpectedEnd),
                }
            }
            Token::Op(_) | Token::Close => Err(ConditionError::UnexpectedToken {
                token: token.describe(),
                offset: *offset,
            }),
        }
    }
}

fn collapse(mut terms: Vec<Expr>, chain: fn(Vec<Expr>) -> Expr) -> Expr {
    if terms.len() == 1
        && let Some(only) = terms.pop()
    {
        return only;
    }
    chain(terms)
}

fn eval(expr: &Expr, lookup: &dyn Fn(&str) -> Option<Value>) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Var(name) => lookup_path(name, lookup),
        Expr::Not(inner) => Value::Bool(!is_truthy(&eval(inner, lookup))),
        Expr::All(terms) => Value::Bool(terms.iter().all(|t| is_truthy(&eval(t, lookup)))),
        Expr::Any(terms) => Value::Bool(terms.iter().any(|t| is_truthy(&eval(t, lookup)))),
        Expr::Compare(op, left, right) => {
            let left = eval(left, lookup);
            let right = eval(right, lookup);
            Value::Bool(compare(op, &left, &right))
        }
    }
}

/// Resolve `a.b.c` by looking up `a` and walking object fields.
fn lookup_path(path: &str, lookup: &dyn Fn(&str) -> Option<Value>) -> Value {
    if let Some(value) = lookup(path) {
        return value;
    }
    let mut parts = path.split('.');
    let Some(root) = parts.next().and_then(lookup) else {
        return Value::Null;
    };
    parts
        .try_fold(root, |value, key| value.get(key).cloned())
        .unwrap_or(Value::Null)
}

fn compare(op: &str, left: &Value, right: &Value) -> bool {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match op {
        "==" => ordering.map_or_else(|| left == right, Ordering::is_eq),
        "!=" => ordering.map_or_else(|| left != right, Ordering::is_ne),
        "<" => ordering.is_some_and(Ordering::is_lt),
        "<=" => ordering.is_some_and(Ordering::is_le),
        ">" => ordering.is_some_and(Ordering::is_gt),
        ">=" => ordering.is_some_and(Ordering::is_ge),
        _ => false,
    }
}
