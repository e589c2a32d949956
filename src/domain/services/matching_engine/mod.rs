pub mod matching_engine;

// Re-exports
pub use matching_engine::{EngineError, EngineResult, MatchResult, MatchingEngine};
