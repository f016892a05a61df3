//! The reasoning agent: ReAct loop, reflection gate, and orchestration.

mod orchestrator;
mod parse;
mod prompts;
mod react;
mod reflection;

pub use orchestrator::Agent;
pub use react::{LoopOutcome, LoopResult, ReactLoop, ReasoningStep};
pub use reflection::{ReflectionGate, ReflectionVerdict};
