// Expose the modules
pub mod domain;

// Re-export key types for easier usage
pub use domain::models::types::{Order, OrderRequest, OrderStatus, Side, Trade};
pub use domain::services::events::{NullListener, OrderListener, TracingListener};
pub use domain::services::matching_engine::matching_engine::{
    EngineError, EngineResult, MatchResult, MatchingEngine,
};
pub use domain::services::orderbook::{BookError, BookSide, PriceLevel};
