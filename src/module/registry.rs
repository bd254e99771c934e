//! In-process registry of content modules.
//!
//! Modules register themselves here at startup; content paths are then
//! resolved to the module with the longest matching name.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::{Module, ModuleManager};

/// Returned by [`ModuleRegistry::register`] when the name is taken.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("module {0:?} is already registered")]
pub struct DuplicateModule(pub String);

/// Registry of content modules, keyed by module name.
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Register a module. The existing entry is kept when the name is taken.
    pub fn register(&mut self, module: Arc<dyn Module>) -> Result<(), DuplicateModule> {
        let name = module.name().to_string();
        if self.modules.contains_key(&name) {
            return Err(DuplicateModule(name));
        }
        self.modules.insert(name, module);
        Ok(())
    }

    /// Register a module, replacing any existing one with the same name.
    pub fn register_or_replace(&mut self, module: Arc<dyn Module>) {
        let name = module.name().to_string();
        self.modules.insert(name, module);
    }

    /// List all registered module names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// True when `name` owns `content_path`: equal, or a prefix ending on a
/// segment boundary. `pods` does not own `podsecurity`.
fn owns(name: &str, content_path: &str) -> bool {
    match content_path.strip_prefix(name) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl ModuleManager for ModuleRegistry {
    fn module_for_content_path(&self, content_path: &str) -> Option<Arc<dyn Module>> {
        self.modules
            .iter()
            .filter(|(name, _)| !name.is_empty() && owns(name, content_path))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, module)| Arc::clone(module))
    }
}
