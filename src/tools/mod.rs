//! Tool metadata and registry.

mod catalog;

pub use catalog::{document_store_registry, ToolCategory, ToolDescriptor, ToolRegistry};
