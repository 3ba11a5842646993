pub mod llm;
pub mod tools;
