use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition of a bean contributed during runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeanSpec {
    pub name: String,
    pub class_id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl BeanSpec {
    pub fn new(name: &str, class_id: &str) -> Self {
        Self {
            name: name.to_string(),
            class_id: class_id.to_string(),
            properties: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn property<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn depends_on(mut self, bean: &str) -> Self {
        self.depends_on.push(bean.to_string());
        self
    }
}

/// Bean definitions collected from plugins before the context is refreshed.
///
/// A later definition with the same name replaces the earlier one but keeps
/// its original position.
#[derive(Debug, Default, Clone)]
pub struct RuntimeConfiguration {
    beans: Vec<BeanSpec>,
}

impl RuntimeConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bean(&mut self, bean: BeanSpec) {
        match self.beans.iter_mut().find(|b| b.name == bean.name) {
            Some(existing) => {
                log::debug!("Bean '{}' redefined", bean.name);
                *existing = bean;
            }
            None => self.beans.push(bean),
        }
    }

    pub fn bean(&self, name: &str) -> Option<&BeanSpec> {
        self.beans.iter().find(|b| b.name == name)
    }

    pub fn bean_names(&self) -> Vec<&str> {
        self.beans.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.beans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }

    /// Copy every collected definition into `ctx`, returning how many were registered
    pub fn register_beans_with(&self, ctx: &ApplicationContext) -> usize {
        for bean in &self.beans {
            ctx.register_bean(bean.clone());
        }
        self.beans.len()
    }
}

/// Container of beans and attributes shared with plugins once the
/// application has been configured.
#[derive(Debug, Default)]
pub struct ApplicationContext {
    active_profiles: Vec<String>,
    beans: RwLock<BTreeMap<String, BeanSpec>>,
    attributes: RwLock<HashMap<String, Value>>,
}

impl ApplicationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles<I, S>(profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active_profiles: profiles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn active_profiles(&self) -> &[String] {
        &self.active_profiles
    }

    pub fn register_bean(&self, bean: BeanSpec) {
        let mut beans = self.beans.write().unwrap_or_else(|e| e.into_inner());
        beans.insert(bean.name.clone(), bean);
    }

    pub fn bean(&self, name: &str) -> Option<BeanSpec> {
        let beans = self.beans.read().unwrap_or_else(|e| e.into_inner());
        beans.get(name).cloned()
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        let beans = self.beans.read().unwrap_or_else(|e| e.into_inner());
        beans.contains_key(name)
    }

    pub fn bean_count(&self) -> usize {
        self.beans.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn set_attribute<V: Into<Value>>(&self, key: &str, value: V) {
        let mut attributes = self.attributes.write().unwrap_or_else(|e| e.into_inner());
        attributes.insert(key.to_string(), value.into());
    }

    /// Attribute converted to `T`; `None` when absent or not convertible
    pub fn attribute<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let attributes = self.attributes.read().unwrap_or_else(|e| e.into_inner());
        attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}
