//! Result normalization and chat rendering.
//!
//! Total mapping from any `Value` the executor or re-parser can produce to
//! a `DisplayValue`: a flat text block (bullet list, bolded number) or a
//! tabular structure with synthetic column labels. Every branch has a
//! default; nothing here returns an error.

use lazy_static::lazy_static;
use regex::Regex;

use crate::value::{self, Value};

/// Leading marker of the error-indicator string convention.
pub const WARNING_GLYPH: &str = "⚠️";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";
const MAX_CELL_WIDTH: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    Text(String),
    Table(TableData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

lazy_static! {
    static ref NUMBER_IN_TEXT: Regex = Regex::new(r"[-+]?\d*\.\d+|\d+").unwrap();
}

/// Normalize a raw result value for display.
pub fn normalize(value: Value) -> DisplayValue {
    let value = match value {
        Value::Text(text) => {
            // An error is never renormalized.
            if text.trim_start().starts_with(WARNING_GLYPH) {
                return DisplayValue::Text(text);
            }
            reparse_text(text)
        }
        other => other,
    };

    match unwrap_singletons(value) {
        Value::Int(n) => DisplayValue::Text(bold_number(n as f64)),
        Value::Float(x) => DisplayValue::Text(bold_number(x)),
        Value::Timestamp(ts) => DisplayValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
        Value::Text(text) => match first_number(&text) {
            Some(n) => DisplayValue::Text(bold_number(n)),
            None => DisplayValue::Text(text),
        },
        Value::Seq(items) => normalize_seq(items),
        Value::Tuple(items) => bullet_list(items.iter().map(clean_cell)),
        Value::Map(pairs) => DisplayValue::Table(TableData {
            columns: pairs.iter().map(|(k, _)| k.clone()).collect(),
            rows: vec![pairs.iter().map(|(_, v)| clean_cell(v)).collect()],
        }),
        Value::Null => DisplayValue::Text("NULL".to_string()),
        Value::Bool(b) => DisplayValue::Text(b.to_string()),
    }
}

/// Reverse textual artifacts: wrapper notation, then the printed form of a
/// container. Scalar parses are deliberately not adopted so plain prose
/// falls through to the text rules.
fn reparse_text(text: String) -> Value {
    let rewritten = value::rewrite_wrapped_numbers(&text);
    match value::parse_literal(&rewritten) {
        Some(parsed @ (Value::Seq(_) | Value::Tuple(_) | Value::Map(_))) => parsed,
        _ => Value::Text(rewritten),
    }
}

/// Unwrap singleton nesting. A one-element sequence whose element is a
/// tuple is left alone so single-row tuple lists stay on the list path.
fn unwrap_singletons(mut value: Value) -> Value {
    loop {
        value = match value {
            Value::Tuple(mut items) if items.len() == 1 => items.pop().unwrap(),
            Value::Seq(mut items)
                if items.len() == 1 && !matches!(items[0], Value::Tuple(_)) =>
            {
                items.pop().unwrap()
            }
            done => return done,
        };
    }
}

fn normalize_seq(items: Vec<Value>) -> DisplayValue {
    if items.is_empty() {
        return DisplayValue::Text("(no results)".to_string());
    }

    let arity = match &items[0] {
        Value::Tuple(first) => {
            let k = first.len();
            items
                .iter()
                .all(|v| matches!(v, Value::Tuple(row) if row.len() == k))
                .then_some(k)
        }
        _ => None,
    };

    match arity {
        Some(1) => bullet_list(items.iter().map(|row| match row {
            Value::Tuple(cells) => clean_cell(&cells[0]),
            _ => unreachable!(),
        })),
        Some(k) => DisplayValue::Table(TableData {
            columns: (1..=k).map(|i| format!("Column {}", i)).collect(),
            rows: items
                .into_iter()
                .map(|row| match row {
                    Value::Tuple(cells) => cells.iter().map(clean_cell).collect(),
                    _ => unreachable!(),
                })
                .collect(),
        }),
        // Tuples absent, mixed, or ragged.
        None => bullet_list(items.iter().map(|v| v.to_string())),
    }
}

fn bullet_list(lines: impl Iterator<Item = String>) -> DisplayValue {
    DisplayValue::Text(
        lines
            .map(|line| format!("- {}", line))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Scalar cleaning for bullets and table cells: integers stay bare, reals
/// get two decimals, timestamps the fixed format.
fn clean_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => format!("{:.2}", x),
        Value::Text(s) => s.clone(),
        Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        nested => nested.to_string(),
    }
}

fn bold_number(n: f64) -> String {
    format!("**{}**", group_thousands(n))
}

/// Two decimal places with thousands separators: 1234567.891 → 1,234,567.89
fn group_thousands(n: f64) -> String {
    let fixed = format!("{:.2}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped: Vec<char> = Vec::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let int_grouped: String = grouped.into_iter().rev().collect();

    let sign = if n < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, int_grouped, frac_part)
}

fn first_number(text: &str) -> Option<f64> {
    NUMBER_IN_TEXT
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Render for the terminal. Text passes through; tables become a
/// width-fitted ASCII grid capped at `max_rows`.
pub fn render(display: &DisplayValue, max_rows: usize) -> String {
    match display {
        DisplayValue::Text(text) => text.clone(),
        DisplayValue::Table(table) => render_table(table, max_rows),
    }
}

fn render_table(table: &TableData, max_rows: usize) -> String {
    let mut out = String::new();

    if table.rows.is_empty() {
        out.push_str("(no results)\n");
        return out;
    }

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in &table.rows {
        for (i, val) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(val.chars().count().min(MAX_CELL_WIDTH));
            }
        }
    }

    let header: String = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(&format!("| {} |\n", header));
    let sep: String = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");
    out.push_str(&format!("|-{}-|\n", sep));

    for row in table.rows.iter().take(max_rows) {
        let line: String = row
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let w = widths.get(i).copied().unwrap_or(10);
                let s = if v.chars().count() > MAX_CELL_WIDTH {
                    let mut truncated: String =
                        v.chars().take(MAX_CELL_WIDTH - 1).collect();
                    truncated.push('…');
                    truncated
                } else {
                    v.clone()
                };
                format!("{:<width$}", s, width = w)
            })
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(&format!("| {} |\n", line));
    }

    if table.rows.len() > max_rows {
        out.push_str(&format!("  … {} more rows\n", table.rows.len() - max_rows));
    }
    out.push_str(&format!("  {} row(s)\n", table.rows.len()));
    out
}
