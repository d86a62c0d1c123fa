use std::sync::LazyLock;

use regex::Regex;

use robinwood_core::{Result, StealError};

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ([,.:;!?])").expect("punctuation pattern is valid"));

/// Collapse whitespace runs to one space, trim the ends and drop spaces before `,.:;!?`.
pub fn normalize_whitespace(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    SPACE_BEFORE_PUNCT
        .replace_all(collapsed.trim(), "$1")
        .into_owned()
}

/// `trim`/`syntax`. Strict mode refuses to turn non-empty input into nothing.
pub fn syntax(text: &str, strict: bool) -> Result<String> {
    let out = normalize_whitespace(text);
    if strict && out.is_empty() && !text.is_empty() {
        return Err(StealError::InvalidInput(
            "content became empty after whitespace normalization".into(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_mixed_whitespace() {
        assert_eq!(normalize_whitespace("a\r\n\tb   c"), "a b c");
    }

    #[test]
    fn trims_ends() {
        assert_eq!(normalize_whitespace("  \n hello \t "), "hello");
    }

    #[test]
    fn removes_space_before_punctuation() {
        assert_eq!(
            normalize_whitespace("Hello , world ! Ready ? yes ; no : maybe ."),
            "Hello, world! Ready? yes; no: maybe."
        );
    }

    #[test]
    fn newline_before_punctuation() {
        assert_eq!(normalize_whitespace("end\n\n."), "end.");
    }

    #[test]
    fn strict_rejects_vanishing_content() {
        assert!(syntax("   \n ", false).unwrap().is_empty());
        let err = syntax("   \n ", true).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(syntax("", true).unwrap(), "");
    }

    #[test]
    fn unicode_whitespace_collapses() {
        assert_eq!(normalize_whitespace("olá\u{00A0}\u{2003}mundo"), "olá mundo");
    }
}
