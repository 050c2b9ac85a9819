//! Fenced-code extraction from model replies.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```[A-Za-z0-9_]*[ \t]*\r?\n(.*?)```").unwrap();
}

/// Return the trimmed contents of the first fenced code block, or the
/// trimmed full reply when no block is present. Stray fence markers on the
/// fallback path are stripped.
pub fn extract_code_block(reply: &str) -> String {
    if let Some(caps) = FENCED_BLOCK.captures(reply) {
        return caps[1].trim().to_string();
    }
    reply
        .trim()
        .trim_start_matches("```sql")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_fenced_block() {
        let reply = "Here you go:\n```sql\nSELECT name FROM ports\n```\nanything else";
        assert_eq!(extract_code_block(reply), "SELECT name FROM ports");
    }

    #[test]
    fn extracts_block_without_language_tag() {
        let reply = "```\nSELECT 1\n```";
        assert_eq!(extract_code_block(reply), "SELECT 1");
    }

    #[test]
    fn first_of_multiple_blocks_wins() {
        let reply = "```sql\nSELECT 1\n```\n```sql\nSELECT 2\n```";
        assert_eq!(extract_code_block(reply), "SELECT 1");
    }

    #[test]
    fn falls_back_to_whole_reply() {
        assert_eq!(
            extract_code_block("  SELECT name FROM ports  "),
            "SELECT name FROM ports"
        );
    }

    #[test]
    fn fallback_strips_stray_fences() {
        assert_eq!(extract_code_block("```sql SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn empty_reply_extracts_empty() {
        assert_eq!(extract_code_block("   "), "");
    }
}
