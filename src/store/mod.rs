//! In-process state stores.
//!
//! Single-process `RwLock` maps behind the same interfaces a durable backend
//! would offer: jobs, monitor state, alerts, and a cached-article store. All
//! methods are async so callers do not care which backing is in use.

mod alerts;
mod articles;
mod jobs;
mod monitors;

pub use alerts::{Alert, AlertStore, AlertType};
pub use articles::{ArticleStore, CachedArticle};
pub use jobs::{Job, JobStatus, JobStore};
pub use monitors::{MonitorState, MonitorStore};
