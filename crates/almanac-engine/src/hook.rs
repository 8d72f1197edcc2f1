//! Hook descriptors attached to events and phenomena.
//!
//! Hooks are opaque to the engine: it orders them and hands them to the host,
//! which decides what a hook of a given type does.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub hook_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl HookDescriptor {
    pub fn priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }
}

/// Hooks ordered by descending priority, ties broken by id.
pub fn sort_hooks_by_priority(hooks: &[HookDescriptor]) -> Vec<HookDescriptor> {
    let mut sorted = hooks.to_vec();
    sorted.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted
}
