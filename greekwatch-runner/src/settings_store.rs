//! Shared, externally mutable settings.
//!
//! Values are kept as raw strings so the store can mirror an external
//! key-value source. Every cycle takes a fresh typed [`Settings`] snapshot;
//! a value that fails to parse fails that cycle only.

use std::collections::BTreeMap;
use std::sync::RwLock;

use greekwatch_core::settings::{default_map, SettingsError};
use greekwatch_core::Settings;

#[derive(Debug)]
pub struct SettingsStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    /// A store seeded with every schema default.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(default_map()),
        }
    }

    /// Defaults, then `overrides`, each validated.
    pub fn with_overrides<I, K, V>(overrides: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let store = Self::new();
        for (k, v) in overrides {
            store.set(k.as_ref(), v.as_ref())?;
        }
        Ok(store)
    }

    /// Validate against the schema, then store.
    pub fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        Settings::validate(key, value)?;
        self.insert_raw(key, value);
        Ok(())
    }

    /// Store without validation, as an out-of-band edit would.
    pub fn insert_raw(&self, key: &str, value: &str) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    pub fn entries(&self) -> BTreeMap<String, String> {
        self.values.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Parse the current values into one typed snapshot.
    pub fn snapshot(&self) -> Result<Settings, SettingsError> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Settings::from_pairs(values.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}
