pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod learning;
pub mod persistence;
pub mod protocol;
pub mod ranking;
pub mod repl;
pub mod scoring;
pub mod server;
pub mod synonyms;
pub mod transport;
pub mod types;
