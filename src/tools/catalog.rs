//! Tool registry — typed metadata for the privileged tool set.
//!
//! Owns tool *metadata* (not implementations — execution belongs to the
//! external collaborator). The registry is built once at startup and passed
//! by reference to both the classifier boundary and the policy client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Error;

/// Coarse sensitivity category for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    ReadOnly,
    Write,
}

impl ToolCategory {
    /// Wire name as exchanged with the classifier collaborator.
    pub fn as_str(self) -> &'static str {
        match self {
            ToolCategory::ReadOnly => "read_only",
            ToolCategory::Write => "write",
        }
    }
}

/// Immutable tool metadata entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub category: ToolCategory,
    pub description: String,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        category: ToolCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            description: description.into(),
        }
    }

    /// Generate a prompt line for this tool.
    ///
    /// Format: `- tool_name [category]: description`
    pub fn to_prompt_line(&self) -> String {
        format!(
            "- {} [{}]: {}",
            self.name,
            self.category.as_str(),
            self.description
        )
    }
}

/// In-memory tool registry. Defined at process start, never mutated after.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    entries: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a tool descriptor.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> crate::types::Result<()> {
        if descriptor.name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        self.entries.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Get a tool descriptor by name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.entries.get(name)
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// List all tool names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all descriptors, sorted by name.
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        let mut descriptors: Vec<&ToolDescriptor> = self.entries.values().collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Generate the formatted tool list handed to the classifier.
    pub fn prompt_lines(&self) -> String {
        let descriptors = self.descriptors();
        if descriptors.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(descriptors.len() + 1);
        lines.push("Available tools:".to_string());
        for descriptor in descriptors {
            lines.push(descriptor.to_prompt_line());
        }
        lines.join("\n")
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The document-store tool set gated by this pipeline.
///
/// Listing, finding, and counting are read-only; everything that creates,
/// mutates, or drops data is a write.
pub fn document_store_registry() -> ToolRegistry {
    let tools = [
        (
            "list_databases",
            ToolCategory::ReadOnly,
            "List all databases in the document store.",
        ),
        (
            "list_collections",
            ToolCategory::ReadOnly,
            "List all collections in a specific database.",
        ),
        (
            "find_documents",
            ToolCategory::ReadOnly,
            "Find documents in a collection.",
        ),
        (
            "count_documents",
            ToolCategory::ReadOnly,
            "Count documents in a collection.",
        ),
        (
            "insert_document",
            ToolCategory::Write,
            "Insert a new document into a collection.",
        ),
        (
            "insert_many_documents",
            ToolCategory::Write,
            "Insert multiple documents into a collection.",
        ),
        (
            "update_document",
            ToolCategory::Write,
            "Update a single document in a collection.",
        ),
        (
            "update_many_documents",
            ToolCategory::Write,
            "Update multiple documents in a collection.",
        ),
        (
            "delete_document",
            ToolCategory::Write,
            "Delete a single document from a collection.",
        ),
        (
            "delete_many_documents",
            ToolCategory::Write,
            "Delete multiple documents from a collection.",
        ),
        (
            "create_collection",
            ToolCategory::Write,
            "Create a new collection in a database.",
        ),
        (
            "drop_collection",
            ToolCategory::Write,
            "Drop (delete) a collection from a database.",
        ),
    ];

    let mut registry = ToolRegistry::new();
    for (name, category, description) in tools {
        // Names are static literals, so registration cannot fail.
        let _ = registry.register(ToolDescriptor::new(name, category, description));
    }
    registry
}

// =============================================================================
// Tests
// =============================================================================
