pub mod git;
pub mod ollama;
