pub mod classifier;
pub mod engine;
pub mod entity;
pub mod error;
pub mod parser;
