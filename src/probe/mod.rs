// src/probe/mod.rs
mod assertion;
mod prober;
mod result;

pub use assertion::{evaluate, needs_body, Verdict};
pub use prober::{HttpProber, Probe, ProbeError};
pub use result::{CheckResult, CheckStatus};
