// src/lib.rs
pub mod cli;
pub mod config;
pub mod incident;
pub mod metrics;
pub mod probe;
pub mod retry;
pub mod runner;
pub mod store;
