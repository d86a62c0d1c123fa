//! Generic pipeline engine.
//!
//! A [`Pipeline`] owns its payload, an ordered list of typed operations and
//! the [`Executor`] that knows how to apply them. Builder calls consume and
//! return the pipeline, so the original-size bookkeeping recorded at
//! construction travels with the value through every chained call.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use robinwood_core::{calculate_metrics, Metrics, NamedOperation, PipelineType, Result, SizeUnit};

/// Applies one modality's operations.
#[async_trait]
pub trait Executor: Send + Sync {
    type Data: Send;
    type Op: NamedOperation + std::fmt::Debug + Send + Sync;
    /// Per-run accumulator threaded through every step.
    type State: Default + Send;
    type Details: Send;

    /// Unit the executor's sizes are counted in.
    const UNIT: SizeUnit;

    async fn apply(
        &self,
        data: Self::Data,
        op: &Self::Op,
        state: &mut Self::State,
    ) -> Result<Self::Data>;

    fn size_of(&self, data: &Self::Data) -> usize;

    fn details(&self, original_size: usize, data: &Self::Data, state: &Self::State)
        -> Self::Details;
}

/// Output of a pipeline run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult<D, T> {
    pub data: D,
    pub metrics: Metrics,
    pub details: T,
    pub operations: Vec<String>,
}

pub struct Pipeline<E: Executor> {
    kind: PipelineType,
    data: E::Data,
    ops: Vec<E::Op>,
    executor: E,
    original_size: usize,
}

impl<E: Executor> Pipeline<E> {
    pub fn new(kind: PipelineType, data: E::Data, executor: E) -> Self {
        let original_size = executor.size_of(&data);
        Self {
            kind,
            data,
            ops: Vec::new(),
            executor,
            original_size,
        }
    }

    /// Queue an operation.
    pub fn then(mut self, op: E::Op) -> Self {
        self.ops.push(op);
        self
    }

    /// Queue several operations in order.
    pub fn then_all(mut self, ops: impl IntoIterator<Item = E::Op>) -> Self {
        self.ops.extend(ops);
        self
    }

    pub fn kind(&self) -> PipelineType {
        self.kind
    }

    pub fn ops(&self) -> &[E::Op] {
        &self.ops
    }

    pub fn original_size(&self) -> usize {
        self.original_size
    }

    /// Run every queued operation in insertion order. The first failure aborts the run.
    #[instrument(skip(self), fields(pipeline = %self.kind, ops = self.ops.len(), original_size = self.original_size))]
    pub async fn execute(self) -> Result<PipelineResult<E::Data, E::Details>> {
        let Self {
            data,
            ops,
            executor,
            original_size,
            ..
        } = self;

        let mut state = E::State::default();
        let mut current = data;
        let mut applied = Vec::with_capacity(ops.len());

        for (step, op) in ops.iter().enumerate() {
            current = executor.apply(current, op, &mut state).await?;
            let size = executor.size_of(&current);
            debug!(step, op = op.name(), size, "operation applied");
            applied.push(op.name().to_string());
        }

        let final_size = executor.size_of(&current);
        let details = executor.details(original_size, &current, &state);

        Ok(PipelineResult {
            metrics: calculate_metrics(original_size, final_size, E::UNIT),
            data: current,
            details,
            operations: applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robinwood_core::StealError;

    #[derive(Debug)]
    enum CharOp {
        DropFirst,
        Double,
        Fail,
    }

    impl NamedOperation for CharOp {
        fn name(&self) -> &'static str {
            match self {
                Self::DropFirst => "drop-first",
                Self::Double => "double",
                Self::Fail => "fail",
            }
        }
    }

    struct CharExecutor;

    #[async_trait]
    impl Executor for CharExecutor {
        type Data = String;
        type Op = CharOp;
        type State = u32;
        type Details = (usize, u32);
        const UNIT: SizeUnit = SizeUnit::Chars;

        async fn apply(&self, data: String, op: &CharOp, state: &mut u32) -> Result<String> {
            *state += 1;
            match op {
                CharOp::DropFirst => Ok(data.chars().skip(1).collect()),
                CharOp::Double => Ok(format!("{data}{data}")),
                CharOp::Fail => Err(StealError::Processing("boom".into())),
            }
        }

        fn size_of(&self, data: &String) -> usize {
            data.chars().count()
        }

        fn details(&self, original_size: usize, _data: &String, state: &u32) -> (usize, u32) {
            (original_size, *state)
        }
    }

    #[tokio::test]
    async fn runs_in_insertion_order() {
        let result = Pipeline::new(PipelineType::Text, "abcd".to_string(), CharExecutor)
            .then(CharOp::DropFirst)
            .then(CharOp::Double)
            .execute()
            .await
            .unwrap();
        assert_eq!(result.data, "bcdbcd");
        assert_eq!(result.operations, vec!["drop-first", "double"]);
        assert_eq!(result.details, (4, 2));
    }

    #[tokio::test]
    async fn original_size_survives_chaining() {
        let pipeline = Pipeline::new(PipelineType::Text, "abcdefghij".to_string(), CharExecutor)
            .then(CharOp::DropFirst)
            .then_all([CharOp::DropFirst, CharOp::DropFirst]);
        assert_eq!(pipeline.original_size(), 10);
        assert_eq!(pipeline.ops().len(), 3);

        let result = pipeline.execute().await.unwrap();
        assert_eq!(result.metrics.saved, 3);
        assert_eq!(result.metrics.compression_ratio, "30.00%");
    }

    #[tokio::test]
    async fn expansion_is_negative_saving() {
        let result = Pipeline::new(PipelineType::Text, "ab".to_string(), CharExecutor)
            .then(CharOp::Double)
            .execute()
            .await
            .unwrap();
        assert_eq!(result.metrics.saved, -2);
    }

    #[tokio::test]
    async fn first_error_aborts() {
        let err = Pipeline::new(PipelineType::Text, "ab".to_string(), CharExecutor)
            .then(CharOp::Fail)
            .then(CharOp::Double)
            .execute()
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PROCESSING_ERROR");
    }

    #[tokio::test]
    async fn empty_queue_returns_input() {
        let result = Pipeline::new(PipelineType::Text, "same".to_string(), CharExecutor)
            .execute()
            .await
            .unwrap();
        assert_eq!(result.data, "same");
        assert!(result.operations.is_empty());
        assert_eq!(result.metrics.compression_ratio, "0.00%");
    }
}
