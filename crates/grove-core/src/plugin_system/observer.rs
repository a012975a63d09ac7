use std::collections::HashMap;

use crate::kernel::constants::WILDCARD_OBSERVER;
use crate::utils::naming::normalize_plugin_name;

/// Index from observed plugin name to the plugins observing it.
#[derive(Debug, Default, Clone)]
pub struct ObserverRegistry {
    observers: HashMap<String, Vec<String>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `observer` as observing each of `observed`
    pub fn add<S: AsRef<str>>(&mut self, observer: &str, observed: &[S]) {
        for name in observed {
            let name = normalize_plugin_name(name.as_ref());
            let set = self.observers.entry(name).or_default();
            if !set.iter().any(|o| o == observer) {
                set.push(observer.to_string());
            }
        }
    }

    /// Specific observers of `subject` followed by wildcard observers,
    /// without duplicates and never including `subject` itself
    pub fn observers_of(&self, subject: &str) -> Vec<String> {
        let subject = normalize_plugin_name(subject);
        let specific = self.observers.get(&subject).into_iter().flatten();
        let wildcard = self.observers.get(WILDCARD_OBSERVER).into_iter().flatten();

        let mut result: Vec<String> = Vec::new();
        for observer in specific.chain(wildcard) {
            if *observer != subject && !result.contains(observer) {
                result.push(observer.clone());
            }
        }
        result
    }

    /// Forget every observation made by `observer`
    pub fn remove_observer(&mut self, observer: &str) {
        for set in self.observers.values_mut() {
            set.retain(|o| o != observer);
        }
        self.observers.retain(|_, set| !set.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }
}
