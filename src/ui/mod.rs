// UI and formatting module

pub mod summary;

// Re-export commonly used items for cleaner imports
pub use summary::{format_health, format_rate, format_summary};
