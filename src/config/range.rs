//! Range expressions
//!
//! A range expression lists candidate values as repeated bracket terms:
//!
//! ```text
//! [1]*3 + [4]*2 + [True] + ['String']   ->  1, 1, 1, 4, 4, true, "String"
//! [(3, 3), (5, 5)]                      ->  [3, 3], [5, 5]
//! []                                    ->  (nothing)
//! ```
//!
//! A term is `[literal, ...]` with an optional `*<positive integer>`
//! multiplier. Literals are numbers, quoted strings, `True`/`False`,
//! `None`, and nested `[...]`, `(...)` and `{key: value}` literals.

use crate::error::ConfigError;
use serde_json::{Map, Number, Value};

/// Most candidates a single expression may expand to
pub const MAX_CANDIDATES: usize = 1 << 20;

/// Whether a document string should be read as a range expression
pub fn looks_like_range(text: &str) -> bool {
    text.trim_start().starts_with('[')
}

/// Evaluate a range expression to its flat, ordered list of candidates
pub fn parse(expr: &str) -> Result<Vec<Value>, ConfigError> {
    let mut parser = Parser::new(expr);
    let terms = parser.expression()?;

    if terms.iter().any(|term| term.items.is_empty()) {
        if terms.len() == 1 {
            return Ok(Vec::new());
        }
        return Err(parser.error("an empty term cannot be combined with other terms"));
    }

    let total = terms
        .iter()
        .try_fold(0usize, |sum, term| term.items.len().checked_mul(term.repeat)?.checked_add(sum))
        .filter(|total| *total <= MAX_CANDIDATES)
        .ok_or_else(|| parser.error(&format!("expands to more than {} candidates", MAX_CANDIDATES)))?;

    let mut values = Vec::with_capacity(total);
    for term in terms {
        for _ in 0..term.repeat {
            values.extend(term.items.iter().cloned());
        }
    }
    Ok(values)
}

struct Term {
    items: Vec<Value>,
    repeat: usize,
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: &str) -> ConfigError {
        ConfigError::ConfigFormat(format!(
            "invalid range expression '{}': {} (at offset {})",
            self.source, reason, self.pos
        ))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ConfigError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(&format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(&format!("expected '{}', found end of input", expected))),
        }
    }

    fn expression(&mut self) -> Result<Vec<Term>, ConfigError> {
        let mut terms = vec![self.term()?];
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(terms),
                Some('+') => {
                    self.pos += 1;
                    terms.push(self.term()?);
                }
                Some(c) => return Err(self.error(&format!("expected '+' or end of input, found '{}'", c))),
            }
        }
    }

    fn term(&mut self) -> Result<Term, ConfigError> {
        self.expect('[')?;
        let items = self.sequence(']')?;

        self.skip_whitespace();
        let repeat = if self.peek() == Some('*') {
            self.pos += 1;
            self.multiplier()?
        } else {
            1
        };

        Ok(Term { items, repeat })
    }

    fn multiplier(&mut self) -> Result<usize, ConfigError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("multiplier must be a positive integer"));
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        match digits.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(self.error("multiplier must be a positive integer")),
        }
    }

    /// Comma-separated literals up to `close`; a trailing comma is allowed
    fn sequence(&mut self, close: char) -> Result<Vec<Value>, ConfigError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.literal()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(&format!("expected ',' or '{}', found '{}'", close, c)));
                }
                None => return Err(self.error(&format!("unbalanced brackets, missing '{}'", close))),
            }
        }
    }

    fn literal(&mut self) -> Result<Value, ConfigError> {
        self.skip_whitespace();
        match self.peek() {
            Some('[') => {
                self.pos += 1;
                Ok(Value::Array(self.sequence(']')?))
            }
            Some('(') => {
                self.pos += 1;
                Ok(Value::Array(self.sequence(')')?))
            }
            Some('{') => {
                self.pos += 1;
                self.mapping()
            }
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                self.string(quote).map(Value::String)
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() => self.word(),
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn mapping(&mut self) -> Result<Value, ConfigError> {
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.literal()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err(self.error("mapping keys must be scalars")),
            };
            self.expect(':')?;
            let value = self.literal()?;
            map.insert(key, value);

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(c) => {
                    self.pos -= 1;
                    return Err(self.error(&format!("expected ',' or '}}', found '{}'", c)));
                }
                None => return Err(self.error("unbalanced brackets, missing '}'")),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, ConfigError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(c) => text.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn number(&mut self) -> Result<Value, ConfigError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' | 'e' | 'E' => is_float = true,
                '-' | '+' if matches!(self.chars.get(self.pos - 1), Some('e' | 'E')) => {}
                _ => break,
            }
            self.pos += 1;
        }

        let text: String = self.chars[start..self.pos].iter().filter(|c| **c != '_').collect();
        if is_float {
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| self.error(&format!("invalid number '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(|i| Value::Number(i.into()))
                .map_err(|_| self.error(&format!("invalid number '{}'", text)))
        }
    }

    fn word(&mut self) -> Result<Value, ConfigError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error(&format!("unknown literal '{}'", word)))
            }
        }
    }
}
