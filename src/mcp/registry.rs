//! Tool descriptors and the registry that owns them
//!
//! The registry is filled once at startup and shared read-only afterwards.
//! Listing order is insertion order; re-registering a name replaces the entry
//! in place.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::mcp::types::ToolInfo;

/// Capability implemented by every callable tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Produce a result from arguments that already passed schema validation
    async fn invoke(&self, arguments: Value) -> anyhow::Result<Value>;
}

/// Immutable metadata and bound handler for one tool
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(handler),
        }
    }

    /// Listing triple for `list_tools`
    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

/// Name to descriptor mapping
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor; an existing entry with the same name is replaced
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        match self.index.get(&descriptor.name) {
            Some(&slot) => {
                tracing::debug!(tool = %descriptor.name, "Replacing registered tool");
                self.tools[slot] = descriptor;
            }
            None => {
                self.index.insert(descriptor.name.clone(), self.tools.len());
                self.tools.push(descriptor);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    /// All descriptors as listing triples, in insertion order
    pub fn list_descriptors(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(ToolDescriptor::info).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
