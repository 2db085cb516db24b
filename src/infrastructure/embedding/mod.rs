//! Embedding provider infrastructure

pub mod jina;

pub use jina::{JinaConfig, JinaEmbeddingProvider};
