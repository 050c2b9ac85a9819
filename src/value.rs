//! Tagged result values and the literal re-parser.
//!
//! The execution boundary produces a `Value` instead of an untyped blob, so
//! the formatter can match exhaustively over shapes. The re-parser reverses
//! two artifacts that upstream tooling bakes into textual results: numeric
//! wrapper notation (`Decimal('42.5')`) and the printed form of a
//! sequence/tuple/mapping.

use std::fmt;

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    /// Variable-length sequence.
    Seq(Vec<Value>),
    /// Fixed-arity row.
    Tuple(Vec<Value>),
    /// Keyed single row.
    Map(Vec<(String, Value)>),
}

lazy_static! {
    static ref WRAPPED_NUMBER: Regex =
        Regex::new(r"[A-Za-z_][A-Za-z0-9_]*\('(-?\d+(?:\.\d+)?)'\)").unwrap();
}

/// Rewrite `Ident('<number>')` to the bare number.
pub fn rewrite_wrapped_numbers(text: &str) -> String {
    WRAPPED_NUMBER.replace_all(text, "$1").into_owned()
}

/// Parse the printed form of a literal back into a `Value`.
///
/// Accepts lists, tuples (with the trailing-comma singleton form), mappings
/// with string keys, single- and double-quoted strings, integers, floats,
/// booleans and null spellings. Returns `None` on anything else; callers
/// keep the original text in that case.
pub fn parse_literal(text: &str) -> Option<Value> {
    let chars: Vec<char> = text.chars().collect();
    let mut parser = LiteralParser { chars, pos: 0 };
    parser.skip_ws();
    let value = parser.parse_value()?;
    parser.skip_ws();
    if parser.pos == parser.chars.len() {
        Some(value)
    } else {
        None
    }
}

/// Try the timestamp spellings SQLite text columns commonly carry.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    None
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> Option<Value> {
        match self.peek()? {
            '[' => self.parse_seq('[', ']').map(Value::Seq),
            '(' => self.parse_tuple(),
            '{' => self.parse_map(),
            '\'' | '"' => self.parse_string().map(Value::Text),
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.parse_number(),
            c if c.is_alphabetic() => self.parse_word(),
            _ => None,
        }
    }

    fn parse_seq(&mut self, open: char, close: char) -> Option<Vec<Value>> {
        debug_assert_eq!(self.peek(), Some(open));
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Some(items);
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {}
                _ => return None,
            }
        }
    }

    /// `(a, b)` is a tuple; `(a,)` is a one-element tuple; `(a)` is just a
    /// parenthesized value.
    fn parse_tuple(&mut self) -> Option<Value> {
        debug_assert_eq!(self.peek(), Some('('));
        self.bump();
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_ws();
            if self.peek() == Some(')') {
                self.bump();
                break;
            }
            items.push(self.parse_value()?);
            trailing_comma = false;
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    trailing_comma = true;
                }
                Some(')') => {}
                _ => return None,
            }
        }
        if items.len() == 1 && !trailing_comma {
            items.pop()
        } else {
            Some(Value::Tuple(items))
        }
    }

    fn parse_map(&mut self) -> Option<Value> {
        debug_assert_eq!(self.peek(), Some('{'));
        self.bump();
        let mut pairs = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Some(Value::Map(pairs));
            }
            let key = match self.peek()? {
                '\'' | '"' => self.parse_string()?,
                _ => return None,
            };
            self.skip_ws();
            if self.bump()? != ':' {
                return None;
            }
            self.skip_ws();
            let value = self.parse_value()?;
            pairs.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                _ => return None,
            }
        }
    }

    fn parse_string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    other => out.push(other),
                },
                c if c == quote => return Some(out),
                c => out.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Option<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else if c == '.' && !is_float {
                is_float = true;
                self.bump();
            } else if (c == 'e' || c == 'E') && self.pos > start {
                is_float = true;
                self.bump();
                if matches!(self.peek(), Some('-') | Some('+')) {
                    self.bump();
                }
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse().ok().map(Value::Float)
        } else {
            text.parse().ok().map(Value::Int)
        }
    }

    fn parse_word(&mut self) -> Option<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            "None" | "null" | "NULL" => Some(Value::Null),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            other => write_nested(other, f),
        }
    }
}

/// Compact form used inside containers; text is quoted there.
fn write_nested(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null => write!(f, "NULL"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(n) => write!(f, "{}", n),
        Value::Float(x) => write!(f, "{}", x),
        Value::Text(s) => write!(f, "'{}'", s),
        Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M")),
        Value::Seq(items) => write_list(f, items, '[', ']'),
        Value::Tuple(items) => write_list(f, items, '(', ')'),
        Value::Map(pairs) => {
            write!(f, "{{")?;
            for (i, (k, v)) in pairs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "'{}': ", k)?;
                write_nested(v, f)?;
            }
            write!(f, "}}")
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value], open: char, close: char) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_nested(item, f)?;
    }
    write!(f, "{}", close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tuple_list() {
        let parsed = parse_literal("[(3,)]").unwrap();
        assert_eq!(parsed, Value::Seq(vec![Value::Tuple(vec![Value::Int(3)])]));
    }

    #[test]
    fn parses_two_column_rows() {
        let parsed = parse_literal("[('Singapore', 42.5), ('Mumbai', 17.0)]").unwrap();
        assert_eq!(
            parsed,
            Value::Seq(vec![
                Value::Tuple(vec![Value::Text("Singapore".into()), Value::Float(42.5)]),
                Value::Tuple(vec![Value::Text("Mumbai".into()), Value::Float(17.0)]),
            ])
        );
    }

    #[test]
    fn parses_mapping() {
        let parsed = parse_literal("{'city': 'Oslo', 'count': 2}").unwrap();
        assert_eq!(
            parsed,
            Value::Map(vec![
                ("city".into(), Value::Text("Oslo".into())),
                ("count".into(), Value::Int(2)),
            ])
        );
    }

    #[test]
    fn parenthesized_scalar_is_not_a_tuple() {
        assert_eq!(parse_literal("(3)"), Some(Value::Int(3)));
        assert_eq!(
            parse_literal("(3,)"),
            Some(Value::Tuple(vec![Value::Int(3)]))
        );
    }

    #[test]
    fn bare_scalars_parse() {
        assert_eq!(parse_literal("12.50"), Some(Value::Float(12.5)));
        assert_eq!(parse_literal("-7"), Some(Value::Int(-7)));
        assert_eq!(parse_literal("None"), Some(Value::Null));
    }

    #[test]
    fn prose_does_not_parse() {
        assert_eq!(parse_literal("twelve ships"), None);
        assert_eq!(parse_literal("[1, 2"), None);
        assert_eq!(parse_literal(""), None);
    }

    #[test]
    fn rewrites_wrapped_numbers() {
        assert_eq!(rewrite_wrapped_numbers("Decimal('42.5')"), "42.5");
        assert_eq!(
            rewrite_wrapped_numbers("[(Decimal('1.50'),), (Decimal('2.25'),)]"),
            "[(1.50,), (2.25,)]"
        );
        assert_eq!(rewrite_wrapped_numbers("no artifacts here"), "no artifacts here");
    }

    #[test]
    fn timestamp_spellings() {
        assert!(parse_timestamp("2026-02-23T18:05:30Z").is_some());
        assert!(parse_timestamp("2026-02-23 18:05:30").is_some());
        assert!(parse_timestamp("2026-02-23").is_none());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn nested_display_quotes_text() {
        let v = Value::Seq(vec![Value::Tuple(vec![
            Value::Text("Oslo".into()),
            Value::Int(4),
        ])]);
        assert_eq!(v.to_string(), "[('Oslo', 4)]");
    }
}
