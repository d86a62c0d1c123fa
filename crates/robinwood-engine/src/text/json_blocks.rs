//! Locate JSON objects and arrays embedded in prose and re-encode them.

use std::collections::HashMap;
use std::ops::Range;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

use robinwood_core::{Result, StealError};

pub const MAX_INDENT: usize = 8;

/// A parsed JSON block and the byte range it occupied.
#[derive(Debug, PartialEq)]
pub struct JsonBlock {
    pub range: Range<usize>,
    pub value: Value,
}

/// Scan left to right for balanced `{...}`/`[...]` candidates that parse as JSON.
///
/// A candidate that is unbalanced or fails to parse is abandoned and scanning
/// resumes one byte after its opening bracket, so valid inner blocks are still found.
pub fn find_blocks(text: &str) -> Vec<JsonBlock> {
    let bytes = text.as_bytes();
    let mut ends = GroupEnds::default();
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if matches!(bytes[i], b'{' | b'[') {
            if let Some(end) = ends.get(bytes, i) {
                if let Ok(value) = serde_json::from_str::<Value>(&text[i..end]) {
                    blocks.push(JsonBlock { range: i..end, value });
                    i = end;
                    continue;
                }
            }
        }
        i += 1;
    }
    blocks
}

/// Exclusive end of the bracket group opening at each position, ignoring brackets inside strings.
///
/// A scan from one opener also settles every opener it passes outside a string:
/// from there on both scans see the same string state, so a nested group closes
/// where the outer scan pops it, and breaks wherever the outer scan breaks with it
/// still open. Each byte is therefore scanned a bounded number of times.
#[derive(Default)]
struct GroupEnds {
    known: HashMap<usize, Option<usize>>,
}

impl GroupEnds {
    fn get(&mut self, bytes: &[u8], start: usize) -> Option<usize> {
        if let Some(&end) = self.known.get(&start) {
            return end;
        }
        self.scan(bytes, start);
        self.known.get(&start).copied().flatten()
    }

    fn scan(&mut self, bytes: &[u8], start: usize) {
        let mut open: Vec<usize> = Vec::new();
        let mut in_string = false;
        let mut escaped = false;
        for (pos, &b) in bytes.iter().enumerate().skip(start) {
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' | b'[' => open.push(pos),
                b'}' | b']' => match open.pop() {
                    Some(opener) if closer_for(bytes[opener]) == b => {
                        self.known.insert(opener, Some(pos + 1));
                        if open.is_empty() {
                            return;
                        }
                    }
                    Some(opener) => {
                        self.known.insert(opener, None);
                        break;
                    }
                    None => break,
                },
                _ => {}
            }
        }
        for opener in open {
            self.known.insert(opener, None);
        }
    }
}

fn closer_for(opener: u8) -> u8 {
    if opener == b'{' {
        b'}'
    } else {
        b']'
    }
}

/// Serialize with `indent` spaces, or compactly when `compact` is set or indent is 0.
pub fn encode(value: &Value, indent: usize, compact: bool) -> Result<String> {
    if compact || indent == 0 {
        return serde_json::to_string(value)
            .map_err(|e| StealError::Processing(format!("json encode: {e}")));
    }
    let pad = " ".repeat(indent);
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(pad.as_bytes()));
    value
        .serialize(&mut ser)
        .map_err(|e| StealError::Processing(format!("json encode: {e}")))?;
    String::from_utf8(out).map_err(|e| StealError::Processing(format!("json encode: {e}")))
}

/// Replace every embedded JSON block with its re-encoded form. Text between blocks is untouched.
pub fn reencode(text: &str, indent: usize, compact: bool) -> Result<String> {
    let blocks = find_blocks(text);
    let mut out = text.to_string();
    // Back to front so earlier ranges stay valid.
    for block in blocks.iter().rev() {
        let encoded = encode(&block.value, indent, compact)?;
        out.replace_range(block.range.clone(), &encoded);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_embedded_object() {
        let text = r#"prefix {"a":1,"b":[1,2]} suffix"#;
        let blocks = find_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(&text[blocks[0].range.clone()], r#"{"a":1,"b":[1,2]}"#);
        assert_eq!(blocks[0].value, json!({"a": 1, "b": [1, 2]}));
    }

    #[test]
    fn pretty_prints_in_place() {
        let out = reencode(r#"prefix {"a":1,"b":[1,2]} suffix"#, 2, false).unwrap();
        assert_eq!(
            out,
            "prefix {\n  \"a\": 1,\n  \"b\": [\n    1,\n    2\n  ]\n} suffix"
        );
    }

    #[test]
    fn compacts_in_place() {
        let out = reencode("see { \"a\" : [ 1 , 2 ] } and [ true ]", 2, true).unwrap();
        assert_eq!(out, r#"see {"a":[1,2]} and [true]"#);
    }

    #[test]
    fn zero_indent_is_compact() {
        assert_eq!(encode(&json!({"a": 1}), 0, false).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn non_json_braces_untouched() {
        assert_eq!(reencode("{a:1}", 2, false).unwrap(), "{a:1}");
        assert_eq!(reencode("unclosed { \"a\": 1", 2, false).unwrap(), "unclosed { \"a\": 1");
    }

    #[test]
    fn brackets_inside_strings_ignored() {
        let text = r#"x {"s":"} ] {"} y"#;
        let blocks = find_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].value, json!({"s": "} ] {"}));
    }

    #[test]
    fn escaped_quote_in_string() {
        let text = r#"{"s":"a\"}"}"#;
        assert_eq!(find_blocks(text)[0].value, json!({"s": "a\"}"}));
    }

    #[test]
    fn invalid_outer_keeps_valid_inner() {
        let out = reencode("{bad: [1, 2]}", 2, true).unwrap();
        assert_eq!(out, "{bad: [1,2]}");
    }

    #[test]
    fn key_order_preserved() {
        let out = reencode(r#"{"z":1,"a":2}"#, 2, true).unwrap();
        assert_eq!(out, r#"{"z":1,"a":2}"#);
    }

    #[test]
    fn multibyte_text_around_blocks() {
        let out = reencode("olá [1,2] fim ✓", 2, true).unwrap();
        assert_eq!(out, "olá [1,2] fim ✓");
    }

    #[test]
    fn unclosed_outer_keeps_closed_inner() {
        assert_eq!(reencode("[ [1, 2]", 2, true).unwrap(), "[ [1,2]");
        assert_eq!(reencode("{[1, 2]]", 2, true).unwrap(), "{[1,2]]");
    }

    #[test]
    fn string_state_is_per_candidate() {
        // From the first brace the quote opens a string; from the bracket it does not.
        let out = reencode(r#"{" [1, 2] x"#, 2, true).unwrap();
        assert_eq!(out, r#"{" [1,2] x"#);
    }

    #[test]
    fn long_unbalanced_runs_scan_in_linear_time() {
        let n = 200_000;
        let started = std::time::Instant::now();
        for text in ["[".repeat(n), "{".repeat(n), "[{".repeat(n / 2), "{]".repeat(n / 2)] {
            assert_eq!(reencode(&text, 2, false).unwrap(), text);
        }
        let deep = format!("{}{}", "[".repeat(n), "[1] ");
        assert_eq!(reencode(&deep, 2, true).unwrap(), deep);
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }
}
