//! Instance cache for shared components, keyed by canonical name.

use crate::traits::Instance;
use std::collections::HashMap;

#[derive(Default, Clone)]
pub struct InstanceCache {
    instances: HashMap<String, Instance>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Instance> {
        self.instances.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, instance: Instance) {
        self.instances.insert(name.to_string(), instance);
    }

    pub fn remove(&mut self, name: &str) -> Option<Instance> {
        self.instances.remove(name)
    }

    /// Snapshot of every cached instance, in name order
    pub fn snapshot(&self) -> Vec<(String, Instance)> {
        let mut entries: Vec<(String, Instance)> = self
            .instances
            .iter()
            .map(|(name, instance)| (name.clone(), instance.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.instances.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
