//! Prompt construction for prescription parsing and medicine lookups

pub mod prompt;

pub use prompt::PromptBuilder;
