// src/retry/mod.rs
mod strategy;

pub use strategy::{RetryDecision, RetryPolicy, RetryStrategy};
