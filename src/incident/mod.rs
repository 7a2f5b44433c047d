// src/incident/mod.rs
mod notifier;
mod sink;
mod tracker;

pub use notifier::{IncidentNotifier, NotifyReport};
pub use sink::{IncidentEvent, IncidentSink, JsonlFeedSink, LogSink};
pub use tracker::{IncidentState, IncidentTracker};
