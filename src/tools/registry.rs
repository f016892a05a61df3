//! Tool registry: name-keyed storage, uniform dispatch, prompt rendering.

use std::collections::HashMap;
use std::sync::Arc;

use crate::tools::tool::{Tool, ToolOutcome};

/// Registry that owns every tool available to the agent.
///
/// Registration order is preserved so `describe()` renders deterministic
/// prompt text run over run.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Names in first-registration order.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Re-registering an existing name overwrites it with a
    /// warning; the name keeps its original position in `describe()`.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            tracing::warn!("Tool '{}' already registered, overwriting", name);
        } else {
            self.order.push(name.clone());
        }
        self.tools.insert(name, Arc::new(tool));
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Dispatch a tool call. Unknown names and internal faults both come back
    /// as failed outcomes, never as errors.
    pub async fn dispatch(&self, name: &str, params: serde_json::Value) -> ToolOutcome {
        let Some(tool) = self.get(name) else {
            return ToolOutcome::failure(format!(
                "Tool '{}' not found. Available tools: {}",
                name,
                self.order.join(", ")
            ));
        };

        tracing::info!(tool = name, "Executing tool");
        match tool.execute(params).await {
            Ok(data) => {
                tracing::info!(tool = name, "Tool completed: success=true");
                ToolOutcome::success(data)
            }
            Err(e) => {
                tracing::warn!(tool = name, "Tool failed: {}", e);
                ToolOutcome::failure(e.to_string())
            }
        }
    }

    /// Render every tool's name, description, and parameter list for prompt
    /// injection, in registration order.
    pub fn describe(&self) -> String {
        let mut sections = Vec::with_capacity(self.order.len());
        for name in &self.order {
            let Some(tool) = self.tools.get(name) else {
                continue;
            };
            let schema = tool.parameters_schema();
            let required: Vec<&str> = schema
                .get("required")
                .and_then(|r| r.as_array())
                .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();

            let mut params = Vec::new();
            if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
                for (param, info) in props {
                    let marker = if required.contains(&param.as_str()) {
                        "(required)"
                    } else {
                        "(optional)"
                    };
                    let description = info
                        .get("description")
                        .and_then(|d| d.as_str())
                        .unwrap_or("No description");
                    params.push(format!("    - {} {}: {}", param, marker, description));
                }
            }

            sections.push(format!(
                "- {}: {}\n  Parameters:\n{}",
                name,
                tool.description(),
                params.join("\n")
            ));
        }
        sections.join("\n\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
