//! `ToolRegistry` (C6): a name -> `Tool` mapping plus the schema payload
//! handed to the model so it knows what it can call.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::tool::Tool;

/// One entry of the tool list sent to the model alongside a chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub risk_level: &'static str,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// The schema payload for every registered tool, in registration order
    /// is not guaranteed (backed by a `HashMap`); callers that need a stable
    /// order should sort by name.
    pub fn schema_for_agent(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema().clone(),
                risk_level: tool.risk_level().as_str(),
            })
            .collect()
    }
}
