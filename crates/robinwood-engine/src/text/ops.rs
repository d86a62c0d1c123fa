use serde::Deserialize;

use robinwood_core::{NamedOperation, Operation, Result, StealError};

use super::dictionary::Language;
use super::json_blocks::MAX_INDENT;

#[derive(Clone, Debug, PartialEq)]
pub enum TextOp {
    Trim { strict: bool },
    Syntax { strict: bool },
    Shorten { language: Language },
    Minify,
    /// Alias of trim kept for API compatibility.
    Compress,
    JsonToToon { indent: usize, compact: bool },
}

impl TextOp {
    pub fn json_to_toon(indent: usize, compact: bool) -> Result<Self> {
        if indent > MAX_INDENT {
            return Err(StealError::out_of_range(
                "json-to-toon",
                "indent",
                indent as f64,
                0.0..=MAX_INDENT as f64,
            ));
        }
        Ok(Self::JsonToToon { indent, compact })
    }

    /// Parse a wire operation. Unknown names fail instead of passing through.
    pub fn parse(op: &Operation) -> Result<Self> {
        match op.name.as_str() {
            "trim" => {
                let p: SyntaxParams = op.params()?;
                Ok(Self::Trim { strict: p.strict })
            }
            "syntax" => {
                let p: SyntaxParams = op.params()?;
                Ok(Self::Syntax { strict: p.strict })
            }
            "shorten" => {
                let p: ShortenParams = op.params()?;
                Ok(Self::Shorten { language: p.language })
            }
            "minify" => {
                let _: NoParams = op.params()?;
                Ok(Self::Minify)
            }
            "compress" => {
                let _: NoParams = op.params()?;
                Ok(Self::Compress)
            }
            "json-to-toon" => {
                let p: JsonToToonParams = op.params()?;
                let indent = p.indent.unwrap_or(2);
                if !(0..=MAX_INDENT as i64).contains(&indent) {
                    return Err(StealError::out_of_range(
                        "json-to-toon",
                        "indent",
                        indent as f64,
                        0.0..=MAX_INDENT as f64,
                    ));
                }
                Self::json_to_toon(indent as usize, p.compact)
            }
            other => Err(StealError::UnknownOperation(other.to_string())),
        }
    }

    pub fn parse_all(ops: &[Operation]) -> Result<Vec<Self>> {
        ops.iter().map(Self::parse).collect()
    }
}

impl NamedOperation for TextOp {
    fn name(&self) -> &'static str {
        match self {
            Self::Trim { .. } => "trim",
            Self::Syntax { .. } => "syntax",
            Self::Shorten { .. } => "shorten",
            Self::Minify => "minify",
            Self::Compress => "compress",
            Self::JsonToToon { .. } => "json-to-toon",
        }
    }
}

// `language` is accepted on trim/syntax for parity with shorten and ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SyntaxParams {
    strict: bool,
    #[allow(dead_code)]
    language: Option<Language>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ShortenParams {
    language: Language,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct JsonToToonParams {
    indent: Option<i64>,
    compact: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_defaults() {
        assert_eq!(TextOp::parse(&Operation::bare("trim")).unwrap(), TextOp::Trim { strict: false });
        assert_eq!(
            TextOp::parse(&Operation::bare("shorten")).unwrap(),
            TextOp::Shorten { language: Language::En }
        );
        assert_eq!(
            TextOp::parse(&Operation::bare("json-to-toon")).unwrap(),
            TextOp::JsonToToon { indent: 2, compact: false }
        );
    }

    #[test]
    fn parses_params() {
        let op = Operation::new("syntax", json!({"strict": true, "language": "pt"}));
        assert_eq!(TextOp::parse(&op).unwrap(), TextOp::Syntax { strict: true });
        let op = Operation::new("shorten", json!({"language": "pt"}));
        assert_eq!(TextOp::parse(&op).unwrap(), TextOp::Shorten { language: Language::Pt });
        let op = Operation::new("json-to-toon", json!({"indent": 4, "compact": true}));
        assert_eq!(TextOp::parse(&op).unwrap(), TextOp::JsonToToon { indent: 4, compact: true });
    }

    #[test]
    fn indent_out_of_range() {
        for indent in [-1, 9] {
            let op = Operation::new("json-to-toon", json!({ "indent": indent }));
            assert_eq!(TextOp::parse(&op).unwrap_err().code(), "INVALID_PARAMETER");
        }
    }

    #[test]
    fn unsupported_language_is_invalid_input() {
        let op = Operation::new("shorten", json!({"language": "fr"}));
        assert_eq!(TextOp::parse(&op).unwrap_err().code(), "INVALID_INPUT");
    }

    #[test]
    fn unknown_operation() {
        let err = TextOp::parse(&Operation::bare("summarize")).unwrap_err();
        assert_eq!(err, StealError::UnknownOperation("summarize".into()));
    }

    #[test]
    fn parse_all_fails_on_first_bad() {
        let ops = [Operation::bare("trim"), Operation::bare("nope"), Operation::bare("minify")];
        assert!(TextOp::parse_all(&ops).is_err());
    }

    #[test]
    fn names_match_wire_names() {
        for name in ["trim", "syntax", "shorten", "minify", "compress", "json-to-toon"] {
            assert_eq!(TextOp::parse(&Operation::bare(name)).unwrap().name(), name);
        }
    }
}
