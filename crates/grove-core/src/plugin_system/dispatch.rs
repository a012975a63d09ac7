use std::collections::{BTreeMap, HashMap};

/// Value types whose cached dispatch entries are cleared before plugins
/// install dynamic behaviour
pub const COMMON_TYPES: &[&str] = &[
    "bool", "u8", "char", "TypeId", "f64", "f32", "i32", "i64", "Number", "i16", "String", "BigInt",
    "BigDecimal", "Url", "Uri",
];

/// Dynamically installed methods, keyed by target type.
///
/// Methods installed while a plugin runs its dynamic-methods hook are
/// recorded as owned by that plugin.
#[derive(Debug, Default)]
pub struct DispatchRegistry {
    methods: HashMap<String, BTreeMap<String, Option<String>>>,
    current_plugin: Option<String>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, type_name: &str, method: &str) {
        let owner = self.current_plugin.clone();
        self.methods
            .entry(type_name.to_string())
            .or_default()
            .insert(method.to_string(), owner);
    }

    pub fn has_method(&self, type_name: &str, method: &str) -> bool {
        self.methods
            .get(type_name)
            .is_some_and(|m| m.contains_key(method))
    }

    pub fn methods_for(&self, type_name: &str) -> Vec<&str> {
        self.methods
            .get(type_name)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Plugin that installed `method` on `type_name`
    pub fn owner_of(&self, type_name: &str, method: &str) -> Option<&str> {
        self.methods.get(type_name)?.get(method)?.as_deref()
    }

    /// Drop every entry cached for `type_name`
    pub fn remove_type(&mut self, type_name: &str) -> bool {
        self.methods.remove(type_name).is_some()
    }

    /// Drop cached entries for the [`COMMON_TYPES`]
    pub fn clear_common_types(&mut self) -> usize {
        COMMON_TYPES.iter().filter(|t| self.remove_type(t)).count()
    }

    pub fn type_count(&self) -> usize {
        self.methods.len()
    }

    pub(crate) fn set_current_plugin(&mut self, plugin_name: Option<&str>) {
        self.current_plugin = plugin_name.map(str::to_string);
    }
}
