//! `${...}` references between blocks
//!
//! `${alicloud_vpc.default.id}` reads attribute `id` of resource
//! `alicloud_vpc.default`; `${data.alicloud_db_instances.dbs.ids}` reads a
//! data source result. Extra segments index into maps and lists
//! (`${data.alicloud_db_instances.dbs.ids.0}`).
//!
//! A string that is exactly one reference takes the referenced value as is;
//! references embedded in a longer string are stringified in place.

use crate::error::{FlowError, Result};
use regex::Regex;
use serde_json::{Map, Value};

/// Shown in plans for values that only exist after apply
pub const UNKNOWN: &str = "(known after apply)";

fn pattern() -> Result<Regex> {
    Regex::new(r"\$\{\s*([A-Za-z0-9_.\-]+)\s*\}")
        .map_err(|e| FlowError::InvalidConfig(format!("invalid pattern: {}", e)))
}

/// What to do with a reference that cannot be resolved yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// Fail with `FlowError::UnresolvedReference`
    Error,
    /// Substitute [`UNKNOWN`]
    Placeholder,
}

/// A parsed reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// `type.name` or `data.type.name`
    pub address: String,
    pub attribute: String,
    /// Further map keys or list indexes
    pub path: Vec<String>,
}

impl Reference {
    pub fn parse(expr: &str) -> Option<Self> {
        let segments: Vec<&str> = expr.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        let address_len = if segments.first() == Some(&"data") { 3 } else { 2 };
        if segments.len() <= address_len {
            return None;
        }
        Some(Self {
            address: segments[..address_len].join("."),
            attribute: segments[address_len].to_string(),
            path: segments[address_len + 1..]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })
    }

    fn select(&self, root: Value) -> Option<Value> {
        self.path.iter().try_fold(root, |value, key| match value {
            Value::Object(mut map) => map.remove(key),
            Value::Array(mut items) => {
                let index: usize = key.parse().ok()?;
                (index < items.len()).then(|| items.swap_remove(index))
            }
            _ => None,
        })
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.address, self.attribute)?;
        for segment in &self.path {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

/// Addresses referenced anywhere in `config`, deduplicated, in order of appearance
pub fn references(config: &Map<String, Value>) -> Result<Vec<String>> {
    let re = pattern()?;
    let mut found = Vec::new();
    for value in config.values() {
        collect(&re, value, &mut found);
    }
    Ok(found)
}

fn collect(re: &Regex, value: &Value, found: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for cap in re.captures_iter(s) {
                if let Some(reference) = Reference::parse(&cap[1])
                    && !found.contains(&reference.address)
                {
                    found.push(reference.address);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect(re, v, found)),
        Value::Object(map) => map.values().for_each(|v| collect(re, v, found)),
        _ => {}
    }
}

/// Substitute every reference in `config`
///
/// `lookup(address, attribute)` returns the attribute of a block known to
/// state, `None` if the block or attribute does not exist yet.
pub fn resolve<F>(
    config: &Map<String, Value>,
    lookup: F,
    mode: Unresolved,
) -> Result<Map<String, Value>>
where
    F: Fn(&str, &str) -> Option<Value>,
{
    let re = pattern()?;
    resolve_map(&re, config, &lookup, mode)
}

fn resolve_map<F>(
    re: &Regex,
    config: &Map<String, Value>,
    lookup: &F,
    mode: Unresolved,
) -> Result<Map<String, Value>>
where
    F: Fn(&str, &str) -> Option<Value>,
{
    config
        .iter()
        .map(|(key, value)| Ok((key.clone(), resolve_value(re, value, lookup, mode)?)))
        .collect()
}

fn resolve_value<F>(re: &Regex, value: &Value, lookup: &F, mode: Unresolved) -> Result<Value>
where
    F: Fn(&str, &str) -> Option<Value>,
{
    match value {
        Value::String(s) => resolve_string(re, s, lookup, mode),
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|v| resolve_value(re, v, lookup, mode))
                .collect::<Result<_>>()?,
        )),
        Value::Object(map) => Ok(Value::Object(resolve_map(re, map, lookup, mode)?)),
        other => Ok(other.clone()),
    }
}

fn resolve_string<F>(re: &Regex, s: &str, lookup: &F, mode: Unresolved) -> Result<Value>
where
    F: Fn(&str, &str) -> Option<Value>,
{
    let lookup_one = |expr: &str| -> Result<Value> {
        let reference = Reference::parse(expr).ok_or_else(|| FlowError::UnresolvedReference {
            reference: expr.to_string(),
            message: "expected type.name.attribute or data.type.name.attribute".to_string(),
        })?;
        match lookup(&reference.address, &reference.attribute).and_then(|v| reference.select(v)) {
            Some(value) => Ok(value),
            None if mode == Unresolved::Placeholder => Ok(Value::String(UNKNOWN.to_string())),
            None => Err(FlowError::UnresolvedReference {
                reference: reference.to_string(),
                message: format!("{} has no such value in state", reference.address),
            }),
        }
    };

    // Whole-string reference keeps the value's type
    if let Some(cap) = re.captures(s)
        && cap.get(0).is_some_and(|m| m.start() == 0 && m.end() == s.len())
    {
        return lookup_one(&cap[1]);
    }

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for cap in re.captures_iter(s) {
        let Some(whole) = cap.get(0) else { continue };
        out.push_str(&s[last..whole.start()]);
        match lookup_one(&cap[1])? {
            Value::String(text) => out.push_str(&text),
            other => out.push_str(&other.to_string()),
        }
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(address: &str, attribute: &str) -> Option<Value> {
        match (address, attribute) {
            ("alicloud_vpc.default", "id") => Some(json!("vpc-123")),
            ("alicloud_vpc.default", "cidr_block") => Some(json!("172.16.0.0/16")),
            ("data.alicloud_db_instances.dbs", "ids") => Some(json!(["rm-1", "rm-2"])),
            ("data.alicloud_db_instances.dbs", "instances") => {
                Some(json!([{ "id": "rm-1", "port": 3306 }]))
            }
            _ => None,
        }
    }

    fn config(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_reference() {
        let r = Reference::parse("alicloud_vpc.default.id").unwrap();
        assert_eq!(r.address, "alicloud_vpc.default");
        assert_eq!(r.attribute, "id");
        assert!(r.path.is_empty());

        let r = Reference::parse("data.alicloud_db_instances.dbs.ids.0").unwrap();
        assert_eq!(r.address, "data.alicloud_db_instances.dbs");
        assert_eq!(r.attribute, "ids");
        assert_eq!(r.path, vec!["0".to_string()]);
        assert_eq!(r.to_string(), "data.alicloud_db_instances.dbs.ids.0");

        assert!(Reference::parse("alicloud_vpc.default").is_none());
        assert!(Reference::parse("alicloud_vpc..id").is_none());
    }

    #[test]
    fn test_whole_string_keeps_type() {
        let resolved = resolve(
            &config(json!({
                "vpc_id": "${alicloud_vpc.default.id}",
                "ids": "${data.alicloud_db_instances.dbs.ids}",
                "port": "${data.alicloud_db_instances.dbs.instances.0.port}",
            })),
            state,
            Unresolved::Error,
        )
        .unwrap();

        assert_eq!(resolved["vpc_id"], json!("vpc-123"));
        assert_eq!(resolved["ids"], json!(["rm-1", "rm-2"]));
        assert_eq!(resolved["port"], json!(3306));
    }

    #[test]
    fn test_embedded_references_are_stringified() {
        let resolved = resolve(
            &config(json!({
                "description": "vpc ${alicloud_vpc.default.id} covers ${alicloud_vpc.default.cidr_block}",
                "nested": { "list": ["${data.alicloud_db_instances.dbs.ids.1}", "plain"] },
            })),
            state,
            Unresolved::Error,
        )
        .unwrap();

        assert_eq!(resolved["description"], json!("vpc vpc-123 covers 172.16.0.0/16"));
        assert_eq!(resolved["nested"]["list"], json!(["rm-2", "plain"]));
    }

    #[test]
    fn test_unresolved_modes() {
        let cfg = config(json!({ "vswitch_id": "${alicloud_vswitch.default.id}" }));

        match resolve(&cfg, state, Unresolved::Error) {
            Err(FlowError::UnresolvedReference { reference, .. }) => {
                assert_eq!(reference, "alicloud_vswitch.default.id")
            }
            other => panic!("expected UnresolvedReference, got {:?}", other),
        }

        let planned = resolve(&cfg, state, Unresolved::Placeholder).unwrap();
        assert_eq!(planned["vswitch_id"], json!(UNKNOWN));
    }

    #[test]
    fn test_references_listing() {
        let cfg = config(json!({
            "vpc_id": "${alicloud_vpc.default.id}",
            "description": "${alicloud_vpc.default.cidr_block} ${data.alicloud_db_instances.dbs.ids.0}",
            "name": "plain",
        }));
        assert_eq!(
            references(&cfg).unwrap(),
            vec![
                "alicloud_vpc.default".to_string(),
                "data.alicloud_db_instances.dbs".to_string()
            ]
        );
    }
}
