//! Proactive monitoring: per-ticker recurring checks with content
//! fingerprinting and alert escalation.

mod scheduler;
mod task;

pub use scheduler::MonitorScheduler;
