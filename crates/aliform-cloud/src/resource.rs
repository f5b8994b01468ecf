//! Per-call view of a resource
//!
//! [`ResourceData`] is what a lifecycle function reads its desired
//! configuration from and writes remote attributes back into. During
//! create/update it carries the desired configuration; during read, delete
//! and import it only carries prior state.

use serde_json::{Map, Value};

/// Desired configuration, prior state and attributes written during a call
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    config: Option<Map<String, Value>>,
    prior: Map<String, Value>,
    written: Map<String, Value>,
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

impl ResourceData {
    /// Data for a resource about to be created, or a data source about to be read
    pub fn from_config(config: Map<String, Value>) -> Self {
        Self {
            config: Some(config),
            ..Default::default()
        }
    }

    /// Data for a resource that already exists
    pub fn from_state(id: impl Into<String>, prior: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            prior,
            ..Default::default()
        }
    }

    /// Attach a desired configuration to existing state
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the remote id; an empty id marks the resource as gone
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn is_gone(&self) -> bool {
        self.id.is_empty()
    }

    /// Current value of an attribute
    ///
    /// Values written during this call win. Otherwise the desired
    /// configuration is used when there is one, else prior state.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.written.get(key) {
            return Some(value);
        }
        match &self.config {
            Some(config) => config.get(key),
            None => self.prior.get(key),
        }
    }

    /// String value, or `""` when absent or not a string
    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or("")
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_map(&self, key: &str) -> Map<String, Value> {
        self.get(key)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the desired value differs from prior state
    ///
    /// Without a desired configuration nothing has changed. Null and the
    /// empty string are treated as the same "unset" value.
    pub fn has_change(&self, key: &str) -> bool {
        let Some(config) = &self.config else {
            return false;
        };
        let desired = config.get(key);
        let prior = self.prior.get(key);
        if is_blank(desired) && is_blank(prior) {
            return false;
        }
        desired != prior
    }

    /// Record an attribute into the new state
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.written.insert(key.into(), value.into());
    }

    /// Attributes to persist: prior state, then config, then written values
    pub fn state_attributes(&self) -> Map<String, Value> {
        let mut merged = self.prior.clone();
        if let Some(config) = &self.config {
            for (k, v) in config {
                merged.insert(k.clone(), v.clone());
            }
        }
        for (k, v) in &self.written {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_get_prefers_written_then_config() {
        let prior = obj(json!({ "name": "old", "cidr_block": "10.0.0.0/8" }));
        let mut d = ResourceData::from_state("vpc-1", prior).with_config(obj(json!({ "name": "new" })));

        assert_eq!(d.get_str("name"), "new");
        // desired config is authoritative when present
        assert_eq!(d.get_str("cidr_block"), "");
        assert_eq!(d.get_str("missing"), "");

        d.set("name", "remote");
        assert_eq!(d.get_str("name"), "remote");
    }

    #[test]
    fn test_get_without_config_reads_prior() {
        let d = ResourceData::from_state("vpc-1", obj(json!({ "cidr_block": "10.0.0.0/8" })));
        assert_eq!(d.get_str("cidr_block"), "10.0.0.0/8");
        assert!(!d.has_change("cidr_block"));
    }

    #[test]
    fn test_has_change() {
        let prior = obj(json!({ "name": "a", "description": "old", "resource_group_id": "" }));
        let d = ResourceData::from_state("vpc-1", prior).with_config(obj(json!({ "name": "b" })));

        assert!(d.has_change("name"));
        assert!(d.has_change("description"));
        assert!(!d.has_change("resource_group_id"));
        assert!(!d.has_change("cidr_block"));
    }

    #[test]
    fn test_state_attributes_merge() {
        let mut d = ResourceData::from_config(obj(json!({ "cidr_block": "10.0.0.0/8" })));
        d.set_id("vpc-1");
        d.set("router_id", "vrt-1");

        let state = d.state_attributes();
        assert_eq!(state["cidr_block"], json!("10.0.0.0/8"));
        assert_eq!(state["router_id"], json!("vrt-1"));
        assert!(!d.is_gone());
    }

    #[test]
    fn test_list_and_map_accessors() {
        let d = ResourceData::from_config(obj(json!({
            "ids": ["a", "b"],
            "tags": { "env": "dev" },
        })));
        assert_eq!(d.get_list("ids"), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(d.get_map("tags")["env"], json!("dev"));
        assert!(d.get_list("missing").is_empty());
    }
}
