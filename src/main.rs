use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use rusqlite::Connection;

use askdb::logging::{app_info, init_logging};
use askdb::schema;
use askdb::session::{ChatSession, Role};
use askdb::settings;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let settings = settings::load_settings();
    let db_path = settings.db_path.clone();

    let conn = Connection::open(&db_path)
        .with_context(|| format!("cannot open database {}", db_path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

    let mut session = ChatSession::new(conn, settings)?;
    app_info(format!("Session started against {}", db_path));

    let table_count = session.schema_context().lines().count();
    println!(
        "askdb {} — connected to {} ({} table{})",
        env!("CARGO_PKG_VERSION"),
        db_path,
        table_count,
        if table_count == 1 { "" } else { "s" }
    );
    println!("Type a question, or :schema, :examples, :history, exit");
    println!();
    println!("{}", session.transcript()[0].content);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("you> ");
        io::stdout().flush().ok();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            ":schema" => {
                let context = session.schema_context();
                if context.is_empty() {
                    println!("(no user tables)");
                } else {
                    println!("{}", context);
                }
            }
            ":examples" => {
                for question in schema::EXAMPLE_QUESTIONS {
                    println!("- {}", question);
                }
            }
            ":history" => {
                for turn in session.transcript() {
                    let tag = match turn.role {
                        Role::Human => "you",
                        Role::Ai => "askdb",
                    };
                    println!("[{} {}] {}", turn.at.format("%H:%M"), tag, turn.content);
                }
            }
            question => {
                let answer = session.ask(question).await;
                println!("{}", answer);
            }
        }
        println!();
    }

    app_info("Session closed");
    Ok(())
}
