//! Doc comment normalization.
//!
//! IDL doc comments arrive as raw source text (`// ...`, `# ...` or `/* ... */`). Only the
//! text inside comment markers is kept; block comments are reflowed line by line with
//! their leading `*` stripped, and linter directives such as `(-- api-linter: ... --)`
//! are removed.

use regex::Regex;
use std::sync::OnceLock;

fn comment_pattern() -> &'static Regex {
    static COMMENT_RE: OnceLock<Regex> = OnceLock::new();
    COMMENT_RE.get_or_init(|| {
        Regex::new(r"//(.*)|#(.*)|/\*([\s\S]*?)\*/").expect("Invalid regex")
    })
}

fn linter_rule_pattern() -> &'static Regex {
    static LINTER_RE: OnceLock<Regex> = OnceLock::new();
    LINTER_RE.get_or_init(|| Regex::new(r"\(-- .* --\)").expect("Invalid regex"))
}

/// Extract the plain text of a raw doc comment.
///
/// Every comment found in `raw` contributes one chunk; chunks are joined with newlines.
/// Text outside comment markers is ignored, so an input without comments yields `""`.
pub fn filter_comment(raw: &str) -> String {
    let mut comments = Vec::new();

    for caps in comment_pattern().captures_iter(raw) {
        let comment = if let Some(line) = caps.get(1).or_else(|| caps.get(2)) {
            line.as_str().trim().to_string()
        } else if let Some(block) = caps.get(3) {
            block
                .as_str()
                .lines()
                .map(|line| line.trim().trim_start_matches('*').trim())
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            continue;
        };
        comments.push(comment);
    }

    let joined = comments.join("\n");
    let stripped = linter_rule_pattern().replace_all(&joined, "");

    stripped
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Like [`filter_comment`], but `None` when nothing remains.
pub fn description_of(raw: &str) -> Option<String> {
    let text = filter_comment(raw);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_comments() {
        let raw = "// Say hello\n//   to someone  \n";
        assert_eq!(filter_comment(raw), "Say hello\nto someone");
    }

    #[test]
    fn test_hash_comments() {
        assert_eq!(filter_comment("# The user id"), "The user id");
    }

    #[test]
    fn test_block_comment_reflow() {
        let raw = "/**\n * Greets a user.\n *\n * Returns a message.\n */";
        assert_eq!(filter_comment(raw), "Greets a user.\n\nReturns a message.");
    }

    #[test]
    fn test_linter_directive_removed() {
        let raw = "// Lists users. (-- api-linter: core::0132=disabled --)";
        assert_eq!(filter_comment(raw), "Lists users.");
    }

    #[test]
    fn test_text_without_markers_is_ignored() {
        assert_eq!(filter_comment("not a comment"), "");
        assert_eq!(description_of(""), None);
        assert_eq!(description_of("//   "), None);
    }

    #[test]
    fn test_description_of_mixed_comments() {
        let raw = "/* Block */\n// line";
        assert_eq!(description_of(raw), Some("Block\nline".to_string()));
    }
}
