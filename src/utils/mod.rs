//! Utility functions for formatting market numbers and strings.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    format_change, format_compact, format_optional, format_price, format_timestamp,
    truncate_string,
};
