pub mod engine;
pub mod paths;
