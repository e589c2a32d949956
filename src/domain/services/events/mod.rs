mod listener;

// Re-exports
pub use listener::{NullListener, OrderListener, TracingListener};
