//! Protocol parser for model responses
//!
//! Recognizes the two textual protocols embedded in free-form model output:
//! fenced ```repl code blocks and the FINAL/FINAL_VAR termination markers.
//! Parsing is pure and total - absence of a marker is "no final answer yet",
//! never an error.

use once_cell::sync::Lazy;
use regex::Regex;

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```repl[ \t]*\n(.*?)\n```").expect("valid regex"));

static FINAL_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^[ \t]*FINAL_VAR\((.*?)\)").expect("valid regex"));

static FINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^[ \t]*FINAL\((.*?)\)").expect("valid regex"));

/// Termination marker found in a response
///
/// `FINAL_VAR` takes precedence over `FINAL` when both appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalMarker {
    /// FINAL(content): the literal answer
    Literal(String),
    /// FINAL_VAR(name): answer is the named environment variable
    Variable(String),
}

/// Everything extracted from one raw model response
///
/// Code blocks and a final marker can legitimately coexist in one response;
/// the controller executes the blocks first and honors the marker after.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    /// Fenced repl snippets, in order of appearance, trimmed
    pub code_blocks: Vec<String>,
    /// The single honored termination marker, if any
    pub final_marker: Option<FinalMarker>,
}

impl ParsedResponse {
    /// True when the response carried neither snippets nor a marker
    pub fn is_empty(&self) -> bool {
        self.code_blocks.is_empty() && self.final_marker.is_none()
    }
}

/// Parse one raw model response
pub fn parse(text: &str) -> ParsedResponse {
    ParsedResponse {
        code_blocks: find_code_blocks(text),
        final_marker: find_final_marker(text),
    }
}

/// Extract every ```repl fenced block, in order, trimmed
pub fn find_code_blocks(text: &str) -> Vec<String> {
    CODE_BLOCK_RE
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Find the termination marker, FINAL_VAR first
pub fn find_final_marker(text: &str) -> Option<FinalMarker> {
    if let Some(caps) = FINAL_VAR_RE.captures(text) {
        return Some(FinalMarker::Variable(trim_variable_name(&caps[1])));
    }
    if let Some(caps) = FINAL_RE.captures(text) {
        return Some(FinalMarker::Literal(caps[1].trim().to_string()));
    }
    None
}

/// Strip surrounding whitespace and quote characters from a variable name
pub fn trim_variable_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim_matches(['\n', '\r'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_code_block() {
        let text = "Let me check.\n```repl\nprint(context[:10])\n```\nDone.";
        let blocks = find_code_blocks(text);
        assert_eq!(blocks, vec!["print(context[:10])"]);
    }

    #[test]
    fn test_multiple_code_blocks_in_order() {
        let text = "```repl\nfirst = 1\n```\ntext between\n```repl\nsecond = 2\n```";
        let blocks = find_code_blocks(text);
        assert_eq!(blocks, vec!["first = 1", "second = 2"]);
    }

    #[test]
    fn test_no_code_blocks() {
        assert!(find_code_blocks("no fences here").is_empty());
        // A python fence is not a repl fence
        assert!(find_code_blocks("```python\nx = 1\n```").is_empty());
    }

    #[test]
    fn test_non_greedy_across_blocks() {
        let text = "```repl\na = 1\n```\n```repl\nb = 2\n```";
        let blocks = find_code_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert!(!blocks[0].contains("b = 2"));
    }

    #[test]
    fn test_final_literal() {
        let marker = find_final_marker("Some reasoning.\nFINAL(the answer)");
        assert_eq!(marker, Some(FinalMarker::Literal("the answer".to_string())));
    }

    #[test]
    fn test_final_var() {
        let marker = find_final_marker("  FINAL_VAR(answer)");
        assert_eq!(marker, Some(FinalMarker::Variable("answer".to_string())));
    }

    #[test]
    fn test_final_var_takes_precedence() {
        let text = "FINAL(literal)\nFINAL_VAR(answer)";
        let marker = find_final_marker(text);
        assert_eq!(marker, Some(FinalMarker::Variable("answer".to_string())));
    }

    #[test]
    fn test_multiline_final_content() {
        let marker = find_final_marker("FINAL(line one\nline two)");
        assert_eq!(
            marker,
            Some(FinalMarker::Literal("line one\nline two".to_string()))
        );
    }

    #[test]
    fn test_marker_must_start_a_line() {
        assert!(find_final_marker("the FINAL(answer) is inline").is_none());
    }

    #[test]
    fn test_variable_name_trimming() {
        assert_eq!(trim_variable_name(" \"answer\" "), "answer");
        assert_eq!(trim_variable_name("'answer'"), "answer");
        assert_eq!(trim_variable_name("answer"), "answer");
    }

    #[test]
    fn test_no_marker_is_none_not_empty() {
        assert!(find_final_marker("still working on it").is_none());
        // An explicitly empty answer is distinct from no answer
        assert_eq!(
            find_final_marker("FINAL()"),
            Some(FinalMarker::Literal(String::new()))
        );
    }

    #[test]
    fn test_parse_carries_both() {
        let text = "```repl\nanswer = '42'\n```\nFINAL_VAR(answer)";
        let parsed = parse(text);
        assert_eq!(parsed.code_blocks.len(), 1);
        assert_eq!(
            parsed.final_marker,
            Some(FinalMarker::Variable("answer".to_string()))
        );
    }
}
