//! Runtime configuration.
//!
//! Settings come from environment variables with sensible defaults, loaded
//! once at startup and passed down explicitly. `.env` files are honored via
//! `dotenvy` before this module reads the environment.

use std::str::FromStr;
use std::time::Duration;

/// LLM provider settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Google AI Studio API key.
    pub google_api_key: String,
    /// Default model for extraction, sentiment, and reflection calls.
    pub model: String,
    /// Stronger model used by the reasoning loop.
    pub react_model: String,
}

/// News provider settings.
#[derive(Debug, Clone)]
pub struct NewsConfig {
    /// NewsAPI key; the news tool reports itself unconfigured when empty.
    pub api_key: String,
    pub base_url: String,
}

/// Analysis pipeline settings.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Reasoning loop iteration budget.
    pub max_steps: u32,
    /// Default lookback window for news retrieval, in days.
    pub days_back: u32,
    /// Default article cap for news retrieval.
    pub max_articles: u32,
    /// Retries granted after a rejected or failed attempt.
    pub max_retries: u32,
}

/// Monitor scheduler settings.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Default interval between firings.
    pub interval: Duration,
    /// New-article count at which a firing escalates to an alert.
    pub min_articles: usize,
}

/// Reflection gate settings.
#[derive(Debug, Clone)]
pub struct ReflectionConfig {
    pub enabled: bool,
    /// Scores at or above this threshold are accepted.
    pub min_quality_score: f64,
}

/// HTTP surface settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub api_prefix: String,
}

/// Top-level settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmConfig,
    pub news: NewsConfig,
    pub analysis: AnalysisConfig,
    pub monitor: MonitorConfig,
    pub reflection: ReflectionConfig,
    pub http: HttpConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                google_api_key: String::new(),
                model: "gemini-2.0-flash".to_string(),
                react_model: "gemini-2.5-pro".to_string(),
            },
            news: NewsConfig {
                api_key: String::new(),
                base_url: "https://newsapi.org/v2".to_string(),
            },
            analysis: AnalysisConfig {
                max_steps: 10,
                days_back: 7,
                max_articles: 5,
                max_retries: 1,
            },
            monitor: MonitorConfig {
                interval: Duration::from_secs(24 * 60 * 60),
                min_articles: 5,
            },
            reflection: ReflectionConfig {
                enabled: true,
                min_quality_score: 0.7,
            },
            http: HttpConfig {
                bind_addr: "127.0.0.1:8080".to_string(),
                api_prefix: "/api/v1".to_string(),
            },
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            llm: LlmConfig {
                google_api_key: std::env::var("GOOGLE_API_KEY").unwrap_or_default(),
                model: std::env::var("LLM_MODEL").unwrap_or(defaults.llm.model),
                react_model: std::env::var("LLM_REACT_MODEL").unwrap_or(defaults.llm.react_model),
            },
            news: NewsConfig {
                api_key: std::env::var("NEWS_API_KEY").unwrap_or_default(),
                base_url: std::env::var("NEWS_API_BASE_URL").unwrap_or(defaults.news.base_url),
            },
            analysis: AnalysisConfig {
                max_steps: parse_env("ANALYSIS_MAX_STEPS", defaults.analysis.max_steps),
                days_back: parse_env("ANALYSIS_DAYS_BACK", defaults.analysis.days_back),
                max_articles: parse_env("ANALYSIS_MAX_ARTICLES", defaults.analysis.max_articles),
                max_retries: parse_env("ANALYSIS_MAX_RETRIES", defaults.analysis.max_retries),
            },
            monitor: MonitorConfig {
                interval: Duration::from_secs(parse_env(
                    "MONITOR_INTERVAL_SECS",
                    defaults.monitor.interval.as_secs(),
                )),
                min_articles: parse_env("MONITOR_MIN_ARTICLES", defaults.monitor.min_articles),
            },
            reflection: ReflectionConfig {
                enabled: parse_env("REFLECTION_ENABLED", defaults.reflection.enabled),
                min_quality_score: parse_env(
                    "REFLECTION_MIN_QUALITY",
                    defaults.reflection.min_quality_score,
                ),
            },
            http: HttpConfig {
                bind_addr: std::env::var("HTTP_BIND_ADDR").unwrap_or(defaults.http.bind_addr),
                api_prefix: std::env::var("HTTP_API_PREFIX").unwrap_or(defaults.http.api_prefix),
            },
        }
    }
}

/// Read and parse one environment variable, keeping the default (with a
/// warning) when the value does not parse.
fn parse_env<T: FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring unparseable {}={:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.analysis.max_steps, 10);
        assert_eq!(settings.analysis.max_retries, 1);
        assert_eq!(settings.monitor.interval, Duration::from_secs(86400));
        assert_eq!(settings.monitor.min_articles, 5);
        assert!((settings.reflection.min_quality_score - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        std::env::set_var("FINSIGHT_TEST_BAD_U32", "not-a-number");
        let value: u32 = parse_env("FINSIGHT_TEST_BAD_U32", 7);
        assert_eq!(value, 7);
        std::env::remove_var("FINSIGHT_TEST_BAD_U32");
    }
}
