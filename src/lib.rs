pub mod artifacts;
pub mod blueprint;
pub mod config;
pub mod errors;
pub mod executor;
pub mod graph;
pub mod prompts;
pub mod runner;
pub mod state;
pub mod tools;
