//! Read-side view of the tool registry.
//!
//! The engine resolves dispatch targets and renders the planner's tool
//! catalog from here. Writes (registration) go through the store's
//! upsert path directly; this type never mutates.

use expediter_core::ToolDescriptor;
use expediter_planner::ToolSpec;
use expediter_store::Store;

use crate::errors::Result;

/// Registry lookups over the durable store.
#[derive(Clone)]
pub struct ToolRegistry {
    store: Store,
}

impl ToolRegistry {
    /// Create a registry view over `store`.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Resolve a tool by name.
    pub fn resolve(&self, name: &str) -> Result<Option<ToolDescriptor>> {
        Ok(self.store.get_tool(name)?)
    }

    /// Render every registered tool into planner-catalog form.
    pub fn specs(&self) -> Result<Vec<ToolSpec>> {
        let tools = self.store.list_tools()?;
        Ok(tools.iter().map(ToolSpec::from_descriptor).collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
