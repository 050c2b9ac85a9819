//! Constrained query execution.
//!
//! Model output is never executed as code. The candidate text must be a
//! single SQLite SELECT statement; it is validated before it touches the
//! connection, and every failure is caught and converted to an
//! error-indicator string at the chat boundary.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use thiserror::Error;
use tracing::debug;

use crate::format::WARNING_GLYPH;
use crate::value::{parse_timestamp, Value};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no usable query in the model reply")]
    NoQuery,
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Syntax(String),
    #[error("{0}")]
    Execution(String),
}

impl QueryError {
    /// The user-visible form: a tagged string with the fixed warning glyph.
    pub fn to_chat_text(&self) -> String {
        match self {
            QueryError::NoQuery => format!("{} No valid query generated.", WARNING_GLYPH),
            QueryError::Syntax(msg) => format!("{} SQL Syntax Error: {}", WARNING_GLYPH, msg),
            QueryError::Rejected(msg) | QueryError::Execution(msg) => {
                format!("{} Execution Error: {}", WARNING_GLYPH, msg)
            }
        }
    }
}

const BLOCKED_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "ATTACH", "DETACH", "PRAGMA",
];

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[A-Za-z_]+").unwrap();
}

/// Close an odd trailing quote. Counts characters only, does not parse;
/// an apostrophe inside a string literal defeats it.
pub fn repair_unbalanced_quotes(sql: &str) -> Cow<'_, str> {
    let singles = sql.chars().filter(|&c| c == '\'').count();
    let doubles = sql.chars().filter(|&c| c == '"').count();
    if singles % 2 == 0 && doubles % 2 == 0 {
        return Cow::Borrowed(sql);
    }
    let mut repaired = sql.to_string();
    if singles % 2 != 0 {
        repaired.push('\'');
    }
    if doubles % 2 != 0 {
        repaired.push('"');
    }
    Cow::Owned(repaired)
}

/// Accept a single SELECT statement; reject everything else before it
/// reaches the connection.
pub fn validate(sql: &str) -> Result<(), QueryError> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(QueryError::NoQuery);
    }

    let upper = trimmed.to_uppercase();
    if !upper.starts_with("SELECT") {
        let head: String = trimmed.chars().take(50).collect();
        return Err(QueryError::Rejected(format!(
            "only SELECT queries are allowed, got: {}",
            head
        )));
    }

    // Keyword scan runs on the statement with string literals blanked out,
    // so a literal like 'DROP' stays legal.
    let unquoted = blank_string_literals(trimmed).to_uppercase();
    for word in WORD.find_iter(&unquoted) {
        if BLOCKED_KEYWORDS.contains(&word.as_str()) {
            return Err(QueryError::Rejected(format!(
                "keyword '{}' is not allowed",
                word.as_str()
            )));
        }
    }

    let statements = unquoted
        .split(';')
        .filter(|part| !part.trim().is_empty())
        .count();
    if statements > 1 {
        return Err(QueryError::Rejected(
            "multiple statements are not allowed".to_string(),
        ));
    }

    Ok(())
}

fn blank_string_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_quote: Option<char> = None;
    for c in sql.chars() {
        match in_quote {
            Some(q) if c == q => {
                in_quote = None;
                out.push(c);
            }
            Some(_) => out.push(' '),
            None => {
                if c == '\'' || c == '"' {
                    in_quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

/// Repair, validate, and run one candidate statement. Rows come back as a
/// sequence of fixed-arity tuples of typed cells.
pub fn run_query(conn: &Connection, candidate: &str) -> Result<Value, QueryError> {
    let sql = repair_unbalanced_quotes(candidate);
    validate(&sql)?;
    debug!(target: "askdb", "executing: {}", sql);

    let mut stmt = conn.prepare(&sql).map_err(prepare_error)?;
    let column_count = stmt.column_count();

    let mut rows = stmt
        .query([])
        .map_err(|e| QueryError::Execution(e.to_string()))?;

    let mut out = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|e| QueryError::Execution(e.to_string()))?
    {
        let mut cells = Vec::with_capacity(column_count);
        for i in 0..column_count {
            let raw: SqlValue = row
                .get(i)
                .map_err(|e| QueryError::Execution(e.to_string()))?;
            cells.push(cell_value(raw));
        }
        out.push(Value::Tuple(cells));
    }

    Ok(Value::Seq(out))
}

/// SQLite reports both bad grammar and unknown tables at prepare time;
/// keep the upstream split between the two.
fn prepare_error(err: rusqlite::Error) -> QueryError {
    let msg = err.to_string();
    if msg.contains("syntax error") {
        QueryError::Syntax(msg)
    } else {
        QueryError::Execution(msg)
    }
}

fn cell_value(raw: SqlValue) -> Value {
    match raw {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(n) => Value::Int(n),
        SqlValue::Real(x) => Value::Float(x),
        SqlValue::Text(s) => match parse_timestamp(&s) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Text(s),
        },
        SqlValue::Blob(_) => Value::Text("[BLOB]".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE ports (name TEXT NOT NULL, tonnage REAL, arrived TEXT);
             INSERT INTO ports VALUES ('Singapore', 42.5, '2026-02-23 18:05:30');
             INSERT INTO ports VALUES ('Mumbai', 17.0, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn repairs_odd_single_quote() {
        assert_eq!(
            repair_unbalanced_quotes("SELECT * FROM ports WHERE name = 'Oslo"),
            "SELECT * FROM ports WHERE name = 'Oslo'"
        );
    }

    #[test]
    fn balanced_quotes_untouched() {
        let sql = "SELECT * FROM ports WHERE name = 'Oslo'";
        assert!(matches!(repair_unbalanced_quotes(sql), Cow::Borrowed(_)));
    }

    #[test]
    fn rejects_non_select() {
        assert!(matches!(
            validate("DELETE FROM ports"),
            Err(QueryError::Rejected(_))
        ));
        assert!(matches!(
            validate("Sure, here is the query you asked for"),
            Err(QueryError::Rejected(_))
        ));
        assert!(matches!(validate("   "), Err(QueryError::NoQuery)));
    }

    #[test]
    fn rejects_blocked_keywords_and_chaining() {
        assert!(matches!(
            validate("SELECT * FROM ports; DROP TABLE ports"),
            Err(QueryError::Rejected(_))
        ));
        assert!(matches!(
            validate("SELECT 1; SELECT 2"),
            Err(QueryError::Rejected(_))
        ));
    }

    #[test]
    fn keyword_inside_string_literal_is_legal() {
        assert!(validate("SELECT * FROM ports WHERE name = 'DROP'").is_ok());
        assert!(validate("SELECT name FROM ports;").is_ok());
    }

    #[test]
    fn runs_a_select_into_typed_rows() {
        let conn = test_conn();
        let value = run_query(&conn, "SELECT name, tonnage FROM ports ORDER BY tonnage DESC")
            .unwrap();
        assert_eq!(
            value,
            Value::Seq(vec![
                Value::Tuple(vec![Value::Text("Singapore".into()), Value::Float(42.5)]),
                Value::Tuple(vec![Value::Text("Mumbai".into()), Value::Float(17.0)]),
            ])
        );
    }

    #[test]
    fn promotes_timestamp_text_cells() {
        let conn = test_conn();
        let value = run_query(&conn, "SELECT arrived FROM ports WHERE name = 'Singapore'")
            .unwrap();
        match value {
            Value::Seq(rows) => match &rows[0] {
                Value::Tuple(cells) => assert!(matches!(cells[0], Value::Timestamp(_))),
                other => panic!("expected tuple row, got {:?}", other),
            },
            other => panic!("expected row sequence, got {:?}", other),
        }
    }

    #[test]
    fn missing_table_is_an_execution_error() {
        let conn = test_conn();
        let err = run_query(&conn, "SELECT * FROM treasure").unwrap_err();
        assert!(matches!(err, QueryError::Execution(_)));
        let text = err.to_chat_text();
        assert!(text.starts_with(WARNING_GLYPH));
        assert!(text.contains("Execution Error"));
    }

    #[test]
    fn bad_grammar_is_a_syntax_error() {
        let conn = test_conn();
        let err = run_query(&conn, "SELECT FROM WHERE").unwrap_err();
        assert!(matches!(err, QueryError::Syntax(_)));
        assert!(err.to_chat_text().contains("SQL Syntax Error"));
    }

    #[test]
    fn never_panics_on_failure_paths() {
        let conn = test_conn();
        for candidate in ["", "DROP TABLE ports", "SELECT * FROM missing", "SELECT '"] {
            let _ = run_query(&conn, candidate).map_err(|e| e.to_chat_text());
        }
    }
}
