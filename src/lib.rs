//! askdb — chat with a SQL database in natural language.
//!
//! Pipeline per user turn: schema-grounded prompt → LLM text-to-SQL →
//! fenced-block extraction → constrained SELECT execution → result
//! normalization → chat transcript.

pub mod exec;
pub mod extract;
pub mod format;
pub mod llm;
pub mod logging;
pub mod schema;
pub mod session;
pub mod settings;
pub mod value;
