//! Registry of the scanners a service instance can run

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use scanhub_adapters::ToolAdapter;
use scanhub_core::domain::{ScanError, ScanTarget, ScannerDescriptor, ScannerSelection};

/// Adapters by scanner name. Populated at start-up, read-only afterwards.
pub struct ScannerRegistry {
    adapters: HashMap<String, Arc<dyn ToolAdapter>>,
    /// Registration order, used for listings
    order: Vec<String>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn from_adapters<I>(adapters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ToolAdapter>>,
    {
        let mut registry = Self::new();
        for adapter in adapters {
            registry.register(adapter);
        }
        registry
    }

    /// Register an adapter, replacing any adapter with the same name
    pub fn register(&mut self, adapter: Arc<dyn ToolAdapter>) {
        let name = adapter.name().to_string();
        if self.adapters.insert(name.clone(), adapter).is_none() {
            self.order.push(name);
        }
    }

    /// Get an adapter by scanner name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.get(name).cloned()
    }

    /// Registered scanner names in registration order
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn descriptors(&self) -> Vec<&ScannerDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.adapters.get(name))
            .map(|adapter| adapter.descriptor())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Check a request's scanner selection against a target.
    ///
    /// Rejects an empty selection, unknown and repeated scanners, then lets
    /// each adapter validate the target and its own parameters.
    pub fn validate_selection(
        &self,
        target: &ScanTarget,
        selections: &[ScannerSelection],
    ) -> Result<(), ScanError> {
        if selections.is_empty() {
            return Err(ScanError::validation("At least one scanner must be selected"));
        }

        let mut seen = HashSet::new();
        for selection in selections {
            if !seen.insert(selection.name.as_str()) {
                return Err(ScanError::validation(format!(
                    "Scanner '{}' is selected more than once",
                    selection.name
                )));
            }
            let adapter = self.get(&selection.name).ok_or_else(|| {
                ScanError::validation(format!(
                    "Unknown scanner '{}'; available: {}",
                    selection.name,
                    self.order.join(", ")
                ))
            })?;
            adapter.validate(target, &selection.parameters)?;
        }
        Ok(())
    }
}

impl Default for ScannerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
