//! Named extension registry.
//!
//! Extensions are defined once at startup and looked up by name for every
//! request. Lookup of an unknown name is not an error: elements routinely
//! reference extensions that were never loaded, and the host skips them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::{Extension, ExtensionName};

/// Registry of extensions keyed by [`ExtensionName`].
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    extensions: HashMap<ExtensionName, Arc<dyn Extension>>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.names())
            .finish()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `extension` under `name`.
    ///
    /// Defining a name twice replaces the earlier extension; the previous one
    /// is returned.
    pub fn define_extension(
        &mut self,
        name: ExtensionName,
        extension: Arc<dyn Extension>,
    ) -> Option<Arc<dyn Extension>> {
        let previous = self.extensions.insert(name.clone(), extension);
        if previous.is_some() {
            warn!(extension = %name, "Extension redefined; previous definition replaced");
        } else {
            debug!(extension = %name, "Extension defined");
        }
        previous
    }

    /// Unregisters `name`, returning the extension if it was defined.
    pub fn remove_extension(&mut self, name: &ExtensionName) -> Option<Arc<dyn Extension>> {
        self.extensions.remove(name)
    }

    pub fn get(&self, name: &ExtensionName) -> Option<Arc<dyn Extension>> {
        self.extensions.get(name).cloned()
    }

    pub fn contains(&self, name: &ExtensionName) -> bool {
        self.extensions.contains_key(name)
    }

    /// Registered names, sorted for stable output.
    pub fn names(&self) -> Vec<&ExtensionName> {
        let mut names: Vec<_> = self.extensions.keys().collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        names
    }

    /// Resolves `requested` to the registered extensions, in request order.
    ///
    /// Unknown names are skipped with a warning. A name listed twice is only
    /// activated once.
    pub fn resolve(&self, requested: &[ExtensionName]) -> Vec<(ExtensionName, Arc<dyn Extension>)> {
        let mut active: Vec<(ExtensionName, Arc<dyn Extension>)> = Vec::new();
        for name in requested {
            if active.iter().any(|(n, _)| n == name) {
                continue;
            }
            match self.extensions.get(name) {
                Some(ext) => active.push((name.clone(), Arc::clone(ext))),
                None => warn!(extension = %name, "Requested extension is not defined; skipping"),
            }
        }
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl Extension for Noop {}

    fn name(s: &str) -> ExtensionName {
        ExtensionName::new(s).unwrap()
    }

    #[test]
    fn define_and_lookup() {
        let mut registry = ExtensionRegistry::new();
        assert!(registry.define_extension(name("a"), Arc::new(Noop)).is_none());
        assert!(registry.contains(&name("a")));
        assert!(registry.get(&name("b")).is_none());
    }

    #[test]
    fn redefinition_returns_previous() {
        let mut registry = ExtensionRegistry::new();
        registry.define_extension(name("a"), Arc::new(Noop));
        assert!(registry.define_extension(name("a"), Arc::new(Noop)).is_some());
        assert_eq!(registry.names().len(), 1);
    }

    #[test]
    fn resolve_keeps_order_and_skips_unknown_and_duplicates() {
        let mut registry = ExtensionRegistry::new();
        registry.define_extension(name("b"), Arc::new(Noop));
        registry.define_extension(name("a"), Arc::new(Noop));

        let active = registry.resolve(&[name("b"), name("missing"), name("a"), name("b")]);
        let names: Vec<_> = active.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn remove_extension() {
        let mut registry = ExtensionRegistry::new();
        registry.define_extension(name("a"), Arc::new(Noop));
        assert!(registry.remove_extension(&name("a")).is_some());
        assert!(registry.resolve(&[name("a")]).is_empty());
    }
}
