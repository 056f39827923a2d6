//! Intent classification contract.
//!
//! The classifier itself is an external collaborator; this module owns the
//! contract its output must satisfy and the fail-closed parsing of whatever
//! it actually returns. At most one tool per request, and the registry's
//! declared category always wins over a self-reported one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tools::{ToolCategory, ToolRegistry};
use crate::types::Result;

/// Category as reported per classification. `Unknown` only ever appears
/// together with an empty tool name (no match).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationCategory {
    ReadOnly,
    Write,
    Unknown,
}

impl From<ToolCategory> for ClassificationCategory {
    fn from(category: ToolCategory) -> Self {
        match category {
            ToolCategory::ReadOnly => ClassificationCategory::ReadOnly,
            ToolCategory::Write => ClassificationCategory::Write,
        }
    }
}

/// Outcome of classifying one prompt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Tool name from the registry; empty means "no match".
    pub tool_name: String,
    pub category: ClassificationCategory,
}

impl ClassificationResult {
    pub fn no_match() -> Self {
        Self {
            tool_name: String::new(),
            category: ClassificationCategory::Unknown,
        }
    }

    pub fn matched(tool_name: impl Into<String>, category: ToolCategory) -> Self {
        Self {
            tool_name: tool_name.into(),
            category: category.into(),
        }
    }

    pub fn is_no_match(&self) -> bool {
        self.tool_name.is_empty()
    }
}

/// Boundary for the classification collaborator.
///
/// Errors are treated by the orchestrator exactly like "no match": the turn
/// reports "no tool detected" and the loop continues.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        prompt: &str,
        registry: &ToolRegistry,
    ) -> Result<ClassificationResult>;
}

/// Raw classifier record as exchanged on the wire.
#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    tool_name: String,
    #[serde(default)]
    tool_type: String,
}

/// Extract the first balanced JSON object embedded in free text.
///
/// Collaborator replies routinely wrap the record in prose or code fences,
/// so scan for the first brace-balanced span that decodes.
fn first_json_object(raw: &str) -> Option<serde_json::Value> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &raw[start..=start + offset];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// Turn a raw collaborator reply into a well-formed [`ClassificationResult`].
///
/// Fail-closed: malformed output, an unlisted tool name, or any other
/// surprise becomes "no match" (the raw text is logged for diagnosis, never
/// interpreted further).
pub fn extract_result(raw: &str, registry: &ToolRegistry) -> ClassificationResult {
    let Some(value) = first_json_object(raw) else {
        tracing::warn!(raw_output = raw, "classifier output had no decodable record");
        return ClassificationResult::no_match();
    };

    let Ok(record) = serde_json::from_value::<RawClassification>(value) else {
        tracing::warn!(raw_output = raw, "classifier record had unexpected shape");
        return ClassificationResult::no_match();
    };

    if record.tool_name.is_empty() {
        return ClassificationResult::no_match();
    }

    let Some(descriptor) = registry.get(&record.tool_name) else {
        tracing::warn!(tool = %record.tool_name, "classifier named a tool not in the registry");
        return ClassificationResult::no_match();
    };

    // Registry wins over the self-reported category.
    if record.tool_type != descriptor.category.as_str() {
        tracing::warn!(
            tool = %record.tool_name,
            reported = %record.tool_type,
            declared = descriptor.category.as_str(),
            "classifier category disagreed with the registry"
        );
    }

    ClassificationResult::matched(record.tool_name, descriptor.category)
}
