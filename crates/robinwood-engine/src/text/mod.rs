//! Text pipeline: whitespace normalization, dictionary shortening and JSON re-encoding.

pub mod dictionary;
pub mod executor;
pub mod json_blocks;
pub mod ops;
pub mod syntax;

pub use dictionary::{Dictionaries, Language};
pub use executor::{TextDetails, TextExecutor, TextPipeline, TextResult};
pub use ops::TextOp;
