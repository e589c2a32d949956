pub mod book_side;

// Re-exports
pub use book_side::{BookError, BookSide, PriceLevel};
