pub mod engine;
pub mod matcher;
