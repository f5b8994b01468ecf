//! Declaration model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Everything declared in one declaration file, in declaration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Infra {
    pub providers: Vec<ProviderBlock>,
    pub resources: Vec<ResourceBlock>,
    pub data: Vec<DataBlock>,
    pub variables: BTreeMap<String, Value>,
    /// Resource and data source addresses in declaration order
    pub order: Vec<String>,
}

impl Infra {
    pub fn provider(&self, name: &str) -> Option<&ProviderBlock> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn resource(&self, address: &str) -> Option<&ResourceBlock> {
        self.resources.iter().find(|r| r.address() == address)
    }

    pub fn data_source(&self, address: &str) -> Option<&DataBlock> {
        self.data.iter().find(|d| d.address() == address)
    }

    /// Resource addresses in declaration order
    pub fn resource_addresses(&self) -> Vec<String> {
        self.resources.iter().map(ResourceBlock::address).collect()
    }

    pub fn is_declared(&self, address: &str) -> bool {
        self.resource(address).is_some() || self.data_source(address).is_some()
    }
}

/// `provider "alicloud" { ... }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderBlock {
    pub name: String,
    pub config: Map<String, Value>,
}

impl ProviderBlock {
    /// String setting, if present and non-empty
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// `resource "alicloud_vpc" "default" { ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceBlock {
    pub resource_type: String,
    pub name: String,
    pub config: Map<String, Value>,
}

impl ResourceBlock {
    /// `type.name`
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    /// Provider prefix of the type (`alicloud` for `alicloud_vpc`)
    pub fn provider_name(&self) -> &str {
        provider_of(&self.resource_type)
    }
}

/// `data "alicloud_db_instances" "dbs" { ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataBlock {
    pub data_type: String,
    pub name: String,
    pub config: Map<String, Value>,
}

impl DataBlock {
    /// `data.type.name`
    pub fn address(&self) -> String {
        format!("data.{}.{}", self.data_type, self.name)
    }

    pub fn provider_name(&self) -> &str {
        provider_of(&self.data_type)
    }
}

fn provider_of(type_name: &str) -> &str {
    type_name.split('_').next().unwrap_or(type_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses() {
        let resource = ResourceBlock {
            resource_type: "alicloud_vpc".to_string(),
            name: "default".to_string(),
            config: Map::new(),
        };
        assert_eq!(resource.address(), "alicloud_vpc.default");
        assert_eq!(resource.provider_name(), "alicloud");

        let data = DataBlock {
            data_type: "alicloud_db_instances".to_string(),
            name: "dbs".to_string(),
            config: Map::new(),
        };
        assert_eq!(data.address(), "data.alicloud_db_instances.dbs");

        let infra = Infra {
            resources: vec![resource],
            data: vec![data],
            ..Default::default()
        };
        assert!(infra.resource("alicloud_vpc.default").is_some());
        assert!(infra.data_source("data.alicloud_db_instances.dbs").is_some());
        assert_eq!(infra.resource_addresses(), vec!["alicloud_vpc.default".to_string()]);
        assert!(infra.is_declared("data.alicloud_db_instances.dbs"));
        assert!(!infra.is_declared("alicloud_vswitch.default"));
    }
}
