use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use robinwood_core::{Operation, PipelineType, Result, SizeUnit};

use super::dictionary::{Dictionaries, Language};
use super::json_blocks;
use super::ops::TextOp;
use super::syntax;
use crate::pipeline::{Executor, Pipeline, PipelineResult};

pub type TextPipeline = Pipeline<TextExecutor>;
pub type TextResult = PipelineResult<String, TextDetails>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDetails {
    pub char_count: usize,
    pub original_char_count: usize,
}

pub struct TextExecutor {
    dictionaries: Arc<Dictionaries>,
}

impl TextExecutor {
    pub fn new(dictionaries: Arc<Dictionaries>) -> Self {
        Self { dictionaries }
    }
}

#[async_trait]
impl Executor for TextExecutor {
    type Data = String;
    type Op = TextOp;
    type State = ();
    type Details = TextDetails;
    const UNIT: SizeUnit = SizeUnit::Chars;

    async fn apply(&self, data: String, op: &TextOp, _state: &mut ()) -> Result<String> {
        match *op {
            TextOp::Trim { strict } | TextOp::Syntax { strict } => syntax::syntax(&data, strict),
            TextOp::Minify | TextOp::Compress => syntax::syntax(&data, false),
            TextOp::Shorten { language } => Ok(self.dictionaries.shorten(&data, language)),
            TextOp::JsonToToon { indent, compact } => json_blocks::reencode(&data, indent, compact),
        }
    }

    fn size_of(&self, data: &String) -> usize {
        data.chars().count()
    }

    fn details(&self, original_size: usize, data: &String, _state: &()) -> TextDetails {
        TextDetails {
            char_count: data.chars().count(),
            original_char_count: original_size,
        }
    }
}

impl Pipeline<TextExecutor> {
    pub fn from_text(text: impl Into<String>, dictionaries: Arc<Dictionaries>) -> Self {
        Pipeline::new(PipelineType::Text, text.into(), TextExecutor::new(dictionaries))
    }

    pub fn trim(self) -> Self {
        self.then(TextOp::Trim { strict: false })
    }

    pub fn syntax(self, strict: bool) -> Self {
        self.then(TextOp::Syntax { strict })
    }

    pub fn shorten(self, language: Language) -> Self {
        self.then(TextOp::Shorten { language })
    }

    pub fn minify(self) -> Self {
        self.then(TextOp::Minify)
    }

    pub fn compress(self) -> Self {
        self.then(TextOp::Compress)
    }

    pub fn json_to_toon(self, indent: usize, compact: bool) -> Result<Self> {
        Ok(self.then(TextOp::json_to_toon(indent, compact)?))
    }

    /// Queue a wire operation after parsing it.
    pub fn apply(self, op: &Operation) -> Result<Self> {
        Ok(self.then(TextOp::parse(op)?))
    }
}
