use std::collections::HashSet;
use std::sync::Arc;

use crate::capability::Capability;
use crate::error::{CoreError, CoreResult};

/// The association between a capability and the keyword set that triggers it.
/// Built once at registration; read-only for the process lifetime.
#[derive(Clone)]
pub struct CapabilityBinding {
    pub name: String,
    /// Lowercased at registration. Multi-word entries match as phrases.
    pub keywords: Vec<String>,
    pub unconditional: bool,
    handler: Arc<dyn Capability>,
}

impl CapabilityBinding {
    pub fn handler(&self) -> Arc<dyn Capability> {
        self.handler.clone()
    }
}

/// Static mapping from command category to executor. Registered at startup,
/// validated before the router accepts traffic, never mutated afterwards —
/// which is what makes lock-free concurrent reads safe.
#[derive(Default)]
pub struct CapabilityRegistry {
    bindings: Vec<CapabilityBinding>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        let binding = CapabilityBinding {
            name: capability.name().to_string(),
            keywords: capability
                .keywords()
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            unconditional: capability.unconditional(),
            handler: capability,
        };
        self.bindings.push(binding);
    }

    /// Reject duplicate names and empty keyword sets before any traffic is
    /// routed.
    pub fn validate(&self) -> CoreResult<()> {
        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if !seen.insert(binding.name.as_str()) {
                return Err(CoreError::InvalidInput(format!(
                    "duplicate capability name '{}'",
                    binding.name
                )));
            }
            if binding.keywords.is_empty() {
                return Err(CoreError::InvalidInput(format!(
                    "capability '{}' has an empty keyword set",
                    binding.name
                )));
            }
        }
        Ok(())
    }

    pub fn bindings(&self) -> &[CapabilityBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
