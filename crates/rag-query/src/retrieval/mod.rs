//! Retrieval orchestration: expansion, search, rerank and answer assembly

pub mod outcome;
pub mod pipeline;
pub mod rank;

pub use outcome::StageOutcome;
pub use pipeline::{compose_query, Providers, RagPipeline};
