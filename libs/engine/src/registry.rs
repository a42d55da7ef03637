use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;

use crate::TableProviderFactory;

#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, Arc<dyn TableProviderFactory>>,
}

impl ProviderRegistry {
    /// Returns `false` and keeps the existing factory if the name is taken.
    pub fn register(&mut self, factory: Arc<dyn TableProviderFactory>) -> bool {
        let name = factory.provider_name();
        if self.factories.contains_key(name) {
            return false;
        }
        self.factories.insert(name.to_string(), factory);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TableProviderFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).sorted().collect()
    }
}
