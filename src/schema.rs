//! Schema introspection and prompt construction.
//!
//! The schema context is built once at session start and handed to the
//! model as grounding. Schema drift after that point is not detected.

use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

/// Canned questions surfaced by the `:examples` meta-command.
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "How many rows are in each table?",
    "What is the average of the largest numeric column?",
    "Show the ten most recent entries",
    "Which name appears most often?",
    "What is the total for the current month?",
    "List every distinct category",
];

pub fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

fn describe_table(conn: &Connection, table: &str) -> Result<String> {
    let mut stmt = conn.prepare(&format!(
        "PRAGMA table_info('{}')",
        table.replace('\'', "''")
    ))?;
    let columns = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let described: Vec<String> = columns
        .into_iter()
        .map(|(name, ty)| {
            if ty.is_empty() {
                name
            } else {
                format!("{} {}", name, ty)
            }
        })
        .collect();
    Ok(format!("Table '{}' ({})", table, described.join(", ")))
}

/// One description line per table. A table whose description cannot be
/// fetched is logged and skipped; the rest of the schema still loads.
pub fn schema_context(conn: &Connection) -> Result<String> {
    let mut lines = Vec::new();
    for table in table_names(conn)? {
        match describe_table(conn, &table) {
            Ok(line) => lines.push(line),
            Err(err) => warn!(target: "askdb", "Could not fetch schema for {}: {}", table, err),
        }
    }
    Ok(lines.join("\n"))
}

/// System prompt for text-to-SQL generation. Pure function of the persona
/// and schema text; the user question travels as the user message.
pub fn build_sql_prompt(persona: &str, schema: &str) -> String {
    format!(
        r#"You are {persona} helping a user explore a SQLite database.

Available table schemas:
{schema}

RULES:
- Reply with exactly one SQLite SELECT statement inside a ```sql fenced block.
- Use ONLY tables and columns from the schemas above.
- Always wrap string values in single quotes (e.g. WHERE name = 'Singapore').
- Never modify data: SELECT only.
- Bound large results with LIMIT 50 unless the question asks otherwise.
- NO explanations. NO comments outside the fenced block."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE ports (name TEXT, tonnage REAL);
             CREATE TABLE visits (port TEXT, arrived TEXT);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn lists_user_tables_in_order() {
        let conn = test_conn();
        assert_eq!(table_names(&conn).unwrap(), vec!["ports", "visits"]);
    }

    #[test]
    fn context_has_one_line_per_table() {
        let conn = test_conn();
        let context = schema_context(&conn).unwrap();
        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Table 'ports' (name TEXT, tonnage REAL)");
        assert!(lines[1].starts_with("Table 'visits'"));
    }

    #[test]
    fn empty_database_yields_empty_context() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_context(&conn).unwrap(), "");
    }

    #[test]
    fn prompt_embeds_persona_and_schema() {
        let prompt = build_sql_prompt("a data navigator", "Table 'ports' (name TEXT)");
        assert!(prompt.contains("a data navigator"));
        assert!(prompt.contains("Table 'ports' (name TEXT)"));
        assert!(prompt.contains("```sql"));
        assert!(prompt.contains("SELECT only"));
    }
}
