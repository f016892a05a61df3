//! Capabilities exposed to the reasoning loop.

pub mod market_data;
pub mod news;
pub mod registry;
pub mod sentiment;
pub mod ticker;
mod tool;

pub use market_data::MarketDataTool;
pub use news::NewsRetrieverTool;
pub use registry::ToolRegistry;
pub use sentiment::SentimentAnalyzerTool;
pub use ticker::TickerExtractorTool;
pub use tool::{Tool, ToolError, ToolOutcome};

use std::sync::Arc;

use crate::config::Settings;
use crate::llm::LlmProvider;
use crate::store::ArticleStore;

/// Build the registry with every built-in tool registered.
pub fn build_registry(
    settings: &Settings,
    llm: Arc<dyn LlmProvider>,
    articles: Arc<ArticleStore>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(TickerExtractorTool::new(Arc::clone(&llm)));
    registry.register(NewsRetrieverTool::new(
        settings.news.clone(),
        settings.analysis.clone(),
        articles,
    ));
    registry.register(SentimentAnalyzerTool::new(
        Arc::clone(&llm),
        settings.llm.model.clone(),
    ));
    registry.register(MarketDataTool::new());
    registry
}
