//! Provider abstractions for the services the pipeline depends on
//!
//! Each stage talks to its service through a trait so the pipeline can run
//! against fakes in tests.

pub mod crossencoder;
pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod qdrant;
pub mod reranker;
pub mod vector_store;

pub use crossencoder::CrossEncoderReranker;
pub use embedding::EmbeddingProvider;
pub use llm::{LlmProvider, QueryExpander};
pub use ollama::{OllamaEmbedder, OllamaExpander, OllamaLlm, OllamaProvider};
pub use qdrant::QdrantVectorStore;
pub use reranker::Reranker;
pub use vector_store::VectorStoreProvider;
