//! Prompt templates for the reasoning loop and the reflection gate.

/// Fixed system instructions prepended to every reasoning-loop prompt.
pub const SYSTEM_PROMPT: &str = "\
You are an autonomous investment research agent.

Your role is to analyze stocks and provide comprehensive, data-driven investment insights by:
1. Gathering relevant news articles about the company
2. Analyzing sentiment from news coverage
3. Fetching financial data (stock prices and recent performance)
4. Synthesizing all data into actionable insights

You use a ReAct (Reasoning + Acting) approach:
- THINK: Reason about what information you need and what tool to use next
- ACT: Call the appropriate tool with the right parameters
- OBSERVE: Analyze the tool's output
- Repeat until you have enough information to provide a comprehensive analysis

Always be thorough but efficient. Gather data from multiple sources before forming conclusions.
Be objective and balanced in your analysis, considering both positive and negative factors.";

/// Render the per-step reasoning prompt.
pub fn react_prompt(
    ticker: &str,
    company_name: &str,
    query: &str,
    tools_description: &str,
    history: &str,
) -> String {
    format!(
        "You are analyzing: {ticker} ({company_name})\n\
         Original query: {query}\n\
         \n\
         Available tools:\n\
         {tools_description}\n\
         \n\
         You must respond in the following JSON format for each step:\n\
         \n\
         For thinking and deciding on an action:\n\
         {{\n\
         \x20   \"thought\": \"Your reasoning about what to do next\",\n\
         \x20   \"action\": \"tool_name\",\n\
         \x20   \"action_input\": {{\n\
         \x20       \"param1\": \"value1\",\n\
         \x20       \"param2\": \"value2\"\n\
         \x20   }}\n\
         }}\n\
         \n\
         When you have gathered enough information and are ready to provide the final analysis:\n\
         {{\n\
         \x20   \"thought\": \"I now have enough information to provide a comprehensive analysis\",\n\
         \x20   \"action\": \"final_answer\",\n\
         \x20   \"action_input\": {{\n\
         \x20       \"analysis_summary\": \"A concise paragraph synthesizing all findings\",\n\
         \x20       \"sentiment_score\": 0.5,\n\
         \x20       \"key_findings\": [\"Finding 1\", \"Finding 2\", \"Finding 3\"]\n\
         \x20   }}\n\
         }}\n\
         \n\
         Rules:\n\
         1. Always start by fetching financial data to understand the company's current state\n\
         2. Then gather recent news for sentiment analysis\n\
         3. Analyze sentiment from the news articles\n\
         4. Synthesize all information before providing final_answer\n\
         5. The sentiment_score must be between -1.0 (very negative) and 1.0 (very positive)\n\
         6. Provide exactly 3-5 key_findings that are actionable insights\n\
         7. Be factual and cite specific data points in your analysis\n\
         \n\
         Previous steps:\n\
         {history}\n\
         \n\
         Now decide your next step. Respond with valid JSON only."
    )
}

/// Render the quality-assessment prompt for the reflection gate.
pub fn reflection_prompt(
    ticker: &str,
    analysis_summary: &str,
    sentiment_score: f64,
    key_findings: &str,
    tools_used: &str,
    sources_count: usize,
) -> String {
    format!(
        "Review the following investment analysis for quality and completeness:\n\
         \n\
         Ticker: {ticker}\n\
         Analysis Summary: {analysis_summary}\n\
         Sentiment Score: {sentiment_score}\n\
         Key Findings:\n\
         {key_findings}\n\
         \n\
         Tools Used: {tools_used}\n\
         Data Sources: {sources_count} sources\n\
         \n\
         Evaluate based on:\n\
         1. Completeness: Were all relevant data sources consulted?\n\
         2. Balance: Does the analysis consider both positive and negative factors?\n\
         3. Specificity: Are findings backed by specific data points?\n\
         4. Actionability: Are the key findings useful for investment decisions?\n\
         \n\
         Respond with JSON:\n\
         {{\n\
         \x20   \"quality_score\": 0.85,\n\
         \x20   \"is_acceptable\": true,\n\
         \x20   \"improvements\": [\"Optional list of specific improvements if not acceptable\"],\n\
         \x20   \"refined_summary\": \"Optional refined summary if the original needs improvement\"\n\
         }}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_react_prompt_interpolates() {
        let prompt = react_prompt("TSLA", "Tesla", "Analyze TSLA", "- market_data: ...", "No previous steps yet.");
        assert!(prompt.contains("You are analyzing: TSLA (Tesla)"));
        assert!(prompt.contains("- market_data: ..."));
        assert!(prompt.contains("No previous steps yet."));
        assert!(prompt.contains("final_answer"));
    }

    #[test]
    fn test_reflection_prompt_interpolates() {
        let prompt = reflection_prompt("TSLA", "summary", 0.4, "- f1", "market_data", 3);
        assert!(prompt.contains("Ticker: TSLA"));
        assert!(prompt.contains("Data Sources: 3 sources"));
        assert!(prompt.contains("quality_score"));
    }
}
