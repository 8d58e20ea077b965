use std::collections::HashMap;

use crate::feature::FeatureKind;

type Factory = Box<dyn Fn() -> FeatureKind + Send + Sync>;

/// Case-sensitive feature-name lookup.
///
/// The registry maps names to factories rather than instances: features hold
/// per-call scratch, so every `measure` call works on fresh instances.
#[derive(Default)]
pub struct FeatureRegistry {
    factories: HashMap<String, Factory>,
}

impl FeatureRegistry {
    pub fn new() -> FeatureRegistry {
        FeatureRegistry::default()
    }

    /// Register a feature under the name its instances report. A later
    /// registration under the same name replaces the earlier one.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> FeatureKind + Send + Sync + 'static,
    {
        let name = factory().info().name().to_string();
        self.factories.insert(name, Box::new(factory));
    }

    pub fn known(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Produce a fresh instance of the named feature.
    pub fn lookup(&self, name: &str) -> Option<FeatureKind> {
        self.factories.get(name).map(|f| f())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
