//! Chat session state and the per-turn pipeline.
//!
//! One `ChatSession` per run owns the database connection, the schema
//! context, the LLM client, and the transcript. Each user submission runs
//! one sequential chain: prompt → model call → extract → validate/execute →
//! normalize → render → transcript. Every failure becomes user-visible text
//! appended like any other answer; nothing here is fatal or retried.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::exec;
use crate::extract::extract_code_block;
use crate::format::{self, DisplayValue, WARNING_GLYPH};
use crate::llm::LlmClient;
use crate::logging::app_warn;
use crate::schema;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Human,
    Ai,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Append-only, ordered; lives for the session only.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            content: content.into(),
            at: Utc::now(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

pub struct ChatSession {
    conn: Connection,
    settings: Settings,
    schema_context: String,
    llm: Option<LlmClient>,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(conn: Connection, settings: Settings) -> anyhow::Result<Self> {
        let schema_context = schema::schema_context(&conn)?;

        let llm = match LlmClient::from_settings(&settings) {
            Ok(client) => {
                info!(target: "askdb", "LLM client ready (model='{}')", client.model());
                Some(client)
            }
            Err(err) => {
                app_warn(format!("LLM client unavailable: {}", err));
                None
            }
        };

        let mut transcript = Transcript::default();
        transcript.push(Role::Ai, settings.greeting.clone());

        Ok(Self {
            conn,
            settings,
            schema_context,
            llm,
            transcript,
        })
    }

    pub fn schema_context(&self) -> &str {
        &self.schema_context
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        self.transcript.turns()
    }

    /// One full turn: ask the model, then answer from its reply.
    pub async fn ask(&mut self, question: &str) -> String {
        let reply = match &self.llm {
            Some(llm) => {
                let system = schema::build_sql_prompt(&self.settings.persona, &self.schema_context);
                llm.complete(&system, question).await
            }
            None => Err("OPENROUTER_API_KEY not set".to_string()),
        };

        match reply {
            Ok(reply) => self.answer_from_reply(question, &reply),
            Err(err) => {
                self.transcript.push(Role::Human, question);
                self.finish_turn(format!("{} Model Error: {}", WARNING_GLYPH, err))
            }
        }
    }

    /// The turn pipeline after the model reply is in hand. Split out so the
    /// whole chain is drivable without a network.
    pub fn answer_from_reply(&mut self, question: &str, reply: &str) -> String {
        self.transcript.push(Role::Human, question);

        let candidate = extract_code_block(reply);
        info!(target: "askdb", "candidate query: {}", candidate);

        let display = match exec::run_query(&self.conn, &candidate) {
            Ok(value) => format::normalize(value),
            Err(err) => DisplayValue::Text(err.to_chat_text()),
        };

        let rendered = format::render(&display, self.settings.max_rows);
        self.finish_turn(rendered)
    }

    fn finish_turn(&mut self, answer: String) -> String {
        self.transcript.push(Role::Ai, answer.clone());
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> ChatSession {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE ports (name TEXT NOT NULL, tonnage REAL);
             INSERT INTO ports VALUES ('Singapore', 42.5);
             INSERT INTO ports VALUES ('Mumbai', 17.0);",
        )
        .unwrap();
        ChatSession::new(conn, Settings::default()).unwrap()
    }

    #[test]
    fn greeting_seeds_the_transcript() {
        let session = test_session();
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].role, Role::Ai);
    }

    #[test]
    fn a_turn_appends_human_then_ai() {
        let mut session = test_session();
        let answer = session.answer_from_reply(
            "how many ports?",
            "```sql\nSELECT COUNT(*) FROM ports\n```",
        );
        assert_eq!(answer, "- 2");

        let turns = session.transcript();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].role, Role::Human);
        assert_eq!(turns[1].content, "how many ports?");
        assert_eq!(turns[2].role, Role::Ai);
        assert_eq!(turns[2].content, "- 2");
    }

    #[test]
    fn transcript_is_append_only_and_ordered() {
        let mut session = test_session();
        for i in 0..3 {
            session.answer_from_reply(
                &format!("question {}", i),
                "```sql\nSELECT name FROM ports\n```",
            );
        }
        let turns = session.transcript();
        assert_eq!(turns.len(), 7);
        let questions: Vec<&str> = turns
            .iter()
            .filter(|t| t.role == Role::Human)
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(questions, vec!["question 0", "question 1", "question 2"]);
        assert!(turns.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn failures_are_answers_not_errors() {
        let mut session = test_session();
        let answer =
            session.answer_from_reply("bad", "```sql\nSELECT * FROM treasure\n```");
        assert!(answer.starts_with(WARNING_GLYPH));
        assert_eq!(session.transcript().last().unwrap().content, answer);
    }
}
