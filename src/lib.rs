pub mod config;
pub mod config_processors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod sources;
pub mod sparse_vector;
pub mod stopwatch;
pub mod vocabulary;
