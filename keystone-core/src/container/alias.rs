//! Alias table: alternate names pointing at a canonical component name.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `alias` at `canonical`. An existing alias is only replaced when
    /// `force` is set. Returns whether the table changed.
    pub fn insert(&mut self, alias: &str, canonical: &str, force: bool) -> bool {
        if !force && self.aliases.contains_key(alias) {
            return false;
        }
        self.aliases.insert(alias.to_string(), canonical.to_string());
        true
    }

    /// Canonical name an alias points at
    pub fn target(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Check whether any alias points at `canonical`
    pub fn is_target(&self, canonical: &str) -> bool {
        self.aliases.values().any(|target| target == canonical)
    }

    /// Aliases pointing at `canonical`, sorted
    pub fn dependents(&self, canonical: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == canonical)
            .map(|(alias, _)| alias.clone())
            .collect();
        names.sort();
        names
    }

    pub fn remove(&mut self, alias: &str) -> Option<String> {
        self.aliases.remove(alias)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.aliases.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
