//! finsight: autonomous investment research.
//!
//! A ReAct reasoning loop drives tool use (news, market data, sentiment),
//! a reflection gate scores results and triggers retries, and a monitor
//! scheduler watches tickers in the background, escalating significant news
//! into proactive alerts. A thin axum surface exposes jobs, monitors, and
//! alerts.

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod monitor;
pub mod report;
pub mod store;
pub mod tools;
