//! Domain layer - errors, trait seams, and pure cache-matching logic

pub mod embedding;
pub mod error;
pub mod generation;
pub mod kv;
pub mod similarity;

pub use embedding::EmbeddingProvider;
pub use error::DomainError;
pub use generation::{Generation, GenerationRequest, GeneratorProvider};
pub use kv::KvStore;
pub use similarity::{CachedEntry, SemanticMatch, best_match, cosine_similarity};
