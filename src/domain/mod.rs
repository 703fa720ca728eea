//! Domain types and DTOs
//!
//! These types define the data structures for projects, their QA corpus,
//! chat turns and the records a turn leaves behind.

pub mod analytics;
pub mod chat;
pub mod projects;
pub mod records;

// Re-export commonly used types
pub use analytics::*;
pub use chat::*;
pub use projects::*;
pub use records::*;
