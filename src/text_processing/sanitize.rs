use lazy_static::lazy_static;
use regex::Regex;

use crate::config::constants::MAX_SANITIZE_LENGTH;
use crate::error::{Result, TtsError};

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"[ \t\n\r\x0C\x0B]+").unwrap();
}

/// Clean request text before chunking and synthesis.
///
/// Strips `<...>` tag spans (an unmatched `<` is kept as-is), collapses
/// short `&...;` entities, folds quote and backtick glyphs to `"`, drops
/// bare `>`, and squashes whitespace runs to a single space.
pub fn sanitize_text(text: &str) -> Result<String> {
    if text.is_empty() {
        return Ok(String::new());
    }

    if text.len() > MAX_SANITIZE_LENGTH {
        return Err(TtsError::validation(
            format!(
                "Input text too long for sanitization (max {} characters)",
                MAX_SANITIZE_LENGTH
            ),
            "input",
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '<' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j] != '>' {
                    j += 1;
                }
                if j < chars.len() {
                    // drop the whole tag span
                    i = j + 1;
                } else {
                    // unmatched '<' is left intact
                    result.push('<');
                    i += 1;
                }
            }
            '&' => {
                // entity: at most 9 chars, no whitespace/angle/ampersand inside
                let mut j = i + 1;
                while j < chars.len()
                    && j < i + 10
                    && chars[j] != ';'
                    && !matches!(chars[j], ' ' | '\t' | '\n' | '\r' | '<' | '>' | '&')
                {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ';' {
                    i = j + 1;
                } else {
                    result.push(' ');
                    i += 1;
                }
            }
            '"' | '\'' | '`' => {
                result.push('"');
                i += 1;
            }
            '>' => {
                i += 1;
            }
            c => {
                result.push(c);
                i += 1;
            }
        }
    }

    let collapsed = WHITESPACE_RUN.replace_all(&result, " ");
    Ok(collapsed.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(sanitize_text("Hello world.").unwrap(), "Hello world.");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_text("").unwrap(), "");
    }

    #[test]
    fn test_strips_tags() {
        assert_eq!(
            sanitize_text("Hello <b>bold</b> world").unwrap(),
            "Hello bold world"
        );
        assert_eq!(
            sanitize_text("<script>alert(1)</script>safe").unwrap(),
            "alert(1)safe"
        );
    }

    #[test]
    fn test_unmatched_angle_bracket_kept() {
        assert_eq!(sanitize_text("a < b").unwrap(), "a < b");
    }

    #[test]
    fn test_bare_closing_bracket_dropped() {
        assert_eq!(sanitize_text("a > b").unwrap(), "a b");
    }

    #[test]
    fn test_collapses_entities() {
        assert_eq!(sanitize_text("fish&amp;chips").unwrap(), "fishchips");
        assert_eq!(sanitize_text("a&nbsp;b").unwrap(), "ab");
    }

    #[test]
    fn test_bare_ampersand_becomes_space() {
        assert_eq!(sanitize_text("salt & pepper").unwrap(), "salt pepper");
    }

    #[test]
    fn test_overlong_entity_not_collapsed() {
        // more than 9 chars between & and ; is not an entity
        assert_eq!(
            sanitize_text("&waytoolongname;x").unwrap(),
            "waytoolongname;x"
        );
    }

    #[test]
    fn test_quotes_folded() {
        assert_eq!(sanitize_text("it's `here' \"now\"").unwrap(), "it\"s \"here\" \"now\"");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(
            sanitize_text("one\t\ttwo\n\nthree   four").unwrap(),
            "one two three four"
        );
    }

    #[test]
    fn test_trimmed() {
        assert_eq!(sanitize_text("  padded  ").unwrap(), "padded");
    }

    #[test]
    fn test_rejects_oversized_input() {
        let text = "a".repeat(MAX_SANITIZE_LENGTH + 1);
        let result = sanitize_text(&text);

        match result {
            Err(TtsError::Validation { message, .. }) => {
                assert!(message.contains("too long"));
            }
            other => panic!("expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_input_at_limit() {
        let text = "a".repeat(MAX_SANITIZE_LENGTH);
        assert!(sanitize_text(&text).is_ok());
    }

    #[test]
    fn test_idempotent() {
        let once = sanitize_text("He said \"hi\" <i>quietly</i> & left.").unwrap();
        let twice = sanitize_text(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unicode_passthrough() {
        assert_eq!(sanitize_text("héllo wörld").unwrap(), "héllo wörld");
    }
}
