//! KDL parser for declaration files
//!
//! ```kdl
//! provider "alicloud" { region "cn-hangzhou" }
//! resource "alicloud_vpc" "default" { cidr_block "172.16.0.0/16" }
//! data "alicloud_db_instances" "dbs" { engine "MySQL" }
//! ```
//!
//! Attribute nodes map onto JSON: one argument is a scalar, several
//! arguments a list, properties or child nodes a map.

use crate::error::{FlowError, Result};
use crate::model::{DataBlock, Infra, ProviderBlock, ResourceBlock};
use kdl::{KdlDocument, KdlNode, KdlValue};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

/// Parse a declaration file (templates must already be rendered)
pub fn parse_infra_file<P: AsRef<Path>>(path: P) -> Result<Infra> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| FlowError::IoError {
        path: path.as_ref().to_path_buf(),
        message: e.to_string(),
    })?;
    parse_infra_str(&content)
}

/// Parse declarations from a string
pub fn parse_infra_str(content: &str) -> Result<Infra> {
    let doc: KdlDocument = content.parse()?;

    let mut infra = Infra::default();
    let mut seen = HashSet::new();

    for node in doc.nodes() {
        match node.name().value() {
            "provider" => {
                let name = string_arg(node, 0, "provider", "a name")?;
                if infra.provider(&name).is_some() {
                    return Err(FlowError::DuplicateBlock {
                        kind: "provider",
                        address: name,
                    });
                }
                infra.providers.push(ProviderBlock {
                    name,
                    config: parse_body(node)?,
                });
            }
            "resource" => {
                let resource_type = string_arg(node, 0, "resource", "a type")?;
                let name = string_arg(node, 1, "resource", "a name")?;
                let block = ResourceBlock {
                    resource_type,
                    name,
                    config: parse_body(node)?,
                };
                if !seen.insert(block.address()) {
                    return Err(FlowError::DuplicateBlock {
                        kind: "resource",
                        address: block.address(),
                    });
                }
                infra.order.push(block.address());
                infra.resources.push(block);
            }
            "data" => {
                let data_type = string_arg(node, 0, "data", "a type")?;
                let name = string_arg(node, 1, "data", "a name")?;
                let block = DataBlock {
                    data_type,
                    name,
                    config: parse_body(node)?,
                };
                if !seen.insert(block.address()) {
                    return Err(FlowError::DuplicateBlock {
                        kind: "data source",
                        address: block.address(),
                    });
                }
                infra.order.push(block.address());
                infra.data.push(block);
            }
            "variables" => {
                for (key, value) in parse_body(node)? {
                    infra.variables.insert(key, value);
                }
            }
            other => {
                tracing::warn!("Ignoring unknown top-level node: {}", other);
            }
        }
    }

    tracing::debug!(
        providers = infra.providers.len(),
        resources = infra.resources.len(),
        data = infra.data.len(),
        "Parsed declarations"
    );
    Ok(infra)
}

fn string_arg(node: &KdlNode, index: usize, kind: &str, what: &str) -> Result<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .nth(index)
        .and_then(|e| e.value().as_string())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| FlowError::InvalidConfig(format!("{} requires {}", kind, what)))
}

/// Children of a block as an attribute map
fn parse_body(node: &KdlNode) -> Result<Map<String, Value>> {
    let mut config = Map::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value().to_string();
            if config.contains_key(&key) {
                return Err(FlowError::InvalidConfig(format!(
                    "attribute {:?} is set more than once",
                    key
                )));
            }
            let value = node_value(child)?;
            config.insert(key, value);
        }
    }
    Ok(config)
}

fn node_value(node: &KdlNode) -> Result<Value> {
    let args: Vec<Value> = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| kdl_value_to_json(e.value()))
        .collect::<Result<_>>()?;
    let props: Map<String, Value> = node
        .entries()
        .iter()
        .filter_map(|e| {
            e.name()
                .map(|name| Ok((name.value().to_string(), kdl_value_to_json(e.value())?)))
        })
        .collect::<Result<_>>()?;
    let has_children = node.children().is_some_and(|c| !c.nodes().is_empty());

    match (args.len(), props.is_empty(), has_children) {
        (0, true, true) => Ok(Value::Object(parse_body(node)?)),
        (0, false, false) => Ok(Value::Object(props)),
        (1, true, false) => Ok(args.into_iter().next().unwrap_or(Value::Null)),
        (n, true, false) if n > 1 => Ok(Value::Array(args)),
        (0, true, false) => Err(FlowError::InvalidConfig(format!(
            "attribute {:?} has no value",
            node.name().value()
        ))),
        _ => Err(FlowError::InvalidConfig(format!(
            "attribute {:?} mixes arguments, properties and children",
            node.name().value()
        ))),
    }
}

/// KDL value as JSON
pub(crate) fn kdl_value_to_json(value: &KdlValue) -> Result<Value> {
    let json = if let Some(s) = value.as_string() {
        Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        let i = i64::try_from(i).map_err(|_| {
            FlowError::InvalidConfig(format!("integer {} does not fit in 64 bits", i))
        })?;
        Value::Number(i.into())
    } else if let Some(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    } else if let Some(b) = value.as_bool() {
        Value::Bool(b)
    } else {
        Value::Null
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
variables {
    name "tf-test"
}

provider "alicloud" {
    region "cn-hangzhou"
}

resource "alicloud_vpc" "default" {
    cidr_block "172.16.0.0/16"
    name "tf-test"
}

resource "alicloud_vswitch" "default" {
    vpc_id "${alicloud_vpc.default.id}"
    cidr_block "172.16.0.0/24"
    availability_zone "cn-hangzhou-b"
}

data "alicloud_db_instances" "dbs" {
    engine "MySQL"
    tags env="dev" team="infra"
}
"#;

    #[test]
    fn test_parse_sample() {
        let infra = parse_infra_str(SAMPLE).unwrap();

        assert_eq!(infra.providers.len(), 1);
        assert_eq!(infra.provider("alicloud").unwrap().get_str("region"), Some("cn-hangzhou"));

        assert_eq!(
            infra.resource_addresses(),
            vec!["alicloud_vpc.default".to_string(), "alicloud_vswitch.default".to_string()]
        );
        let vswitch = infra.resource("alicloud_vswitch.default").unwrap();
        assert_eq!(vswitch.config["vpc_id"], json!("${alicloud_vpc.default.id}"));

        let dbs = infra.data_source("data.alicloud_db_instances.dbs").unwrap();
        assert_eq!(dbs.config["tags"], json!({ "env": "dev", "team": "infra" }));

        assert_eq!(infra.variables["name"], json!("tf-test"));
        assert_eq!(
            infra.order,
            vec![
                "alicloud_vpc.default".to_string(),
                "alicloud_vswitch.default".to_string(),
                "data.alicloud_db_instances.dbs".to_string(),
            ]
        );
    }

    #[test]
    fn test_value_shapes() {
        let infra = parse_infra_str(
            r#"
resource "alicloud_test" "shapes" {
    single "a"
    count 3
    enabled #true
    list "a" "b"
    nested {
        key "value"
    }
}
"#,
        )
        .unwrap();

        let config = &infra.resources[0].config;
        assert_eq!(config["single"], json!("a"));
        assert_eq!(config["count"], json!(3));
        assert_eq!(config["enabled"], json!(true));
        assert_eq!(config["list"], json!(["a", "b"]));
        assert_eq!(config["nested"], json!({ "key": "value" }));
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let result = parse_infra_str(
            r#"
resource "alicloud_vpc" "default" { cidr_block "10.0.0.0/8"; }
resource "alicloud_vpc" "default" { cidr_block "10.0.0.0/8"; }
"#,
        );
        assert!(matches!(result, Err(FlowError::DuplicateBlock { .. })));
    }

    #[test]
    fn test_missing_name_rejected() {
        let result = parse_infra_str(r#"resource "alicloud_vpc" { cidr_block "10.0.0.0/8"; }"#);
        match result {
            Err(FlowError::InvalidConfig(msg)) => assert!(msg.contains("name")),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let result = parse_infra_str(
            r#"resource "alicloud_vpc" "a" { name "x"; name "y"; }"#,
        );
        assert!(matches!(result, Err(FlowError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_attribute_rejected() {
        let result = parse_infra_str(r#"resource "alicloud_vpc" "a" { name; }"#);
        assert!(matches!(result, Err(FlowError::InvalidConfig(_))));
    }

    #[test]
    fn test_integer_out_of_range_rejected() {
        let result = parse_infra_str(
            r#"resource "alicloud_vpc" "a" { size 99999999999999999999; }"#,
        );
        match result {
            Err(FlowError::InvalidConfig(msg)) => assert!(msg.contains("99999999999999999999")),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }

        let infra = parse_infra_str(
            r#"resource "alicloud_vpc" "a" { size -9223372036854775808; }"#,
        )
        .unwrap();
        assert_eq!(infra.resources[0].config["size"], json!(i64::MIN));
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infra.kdl");
        std::fs::write(&path, SAMPLE).unwrap();

        let infra = parse_infra_file(&path).unwrap();
        assert_eq!(infra.resources.len(), 2);

        assert!(matches!(
            parse_infra_file(dir.path().join("missing.kdl")),
            Err(FlowError::IoError { .. })
        ));
    }
}
