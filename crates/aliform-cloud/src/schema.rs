//! Attribute schemas for resources and data sources
//!
//! A [`Schema`] is the static description a resource publishes: which
//! attributes exist, which ones the user must set, which ones are filled in
//! by the cloud, and which ones force a replacement when they change.

use serde_json::{Map, Value};
use std::str::FromStr;

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Int,
    Bool,
    /// List of strings
    List,
    /// Map of string to string
    Map,
    /// List of objects (computed outputs only)
    ObjectList,
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Int => write!(f, "int"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::List => write!(f, "list"),
            AttributeType::Map => write!(f, "map"),
            AttributeType::ObjectList => write!(f, "list of objects"),
        }
    }
}

/// Value checks applied to user-supplied attributes
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    /// A CIDR block whose address is the network address (`10.0.0.0/8`, not `10.0.0.1/8`)
    CidrNetworkAddress,
    /// String length in characters, both ends inclusive
    StringLength { min: usize, max: usize },
    /// Must compile as a regular expression
    Regex,
    /// Must be one of the listed strings
    OneOf(&'static [&'static str]),
    /// Attribute-specific check returning error messages
    Custom(fn(&Value, &str) -> Vec<String>),
}

impl Validator {
    /// Run the check; an empty vector means the value is valid
    pub fn check(&self, key: &str, value: &Value) -> Vec<String> {
        match self {
            Validator::CidrNetworkAddress => match value.as_str() {
                Some(s) => validate_cidr_network_address(key, s).err().into_iter().collect(),
                None => vec![format!("{} must be a string", key)],
            },
            Validator::StringLength { min, max } => match value.as_str() {
                Some(s) => {
                    let len = s.chars().count();
                    if len < *min || len > *max {
                        vec![format!(
                            "{} must contain between {} and {} characters, got {}",
                            key, min, max, len
                        )]
                    } else {
                        Vec::new()
                    }
                }
                None => vec![format!("{} must be a string", key)],
            },
            Validator::Regex => match value.as_str() {
                Some(s) => match regex::Regex::new(s) {
                    Ok(_) => Vec::new(),
                    Err(e) => vec![format!("{} is not a valid regular expression: {}", key, e)],
                },
                None => vec![format!("{} must be a string", key)],
            },
            Validator::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Vec::new(),
                _ => vec![format!(
                    "{} must be one of [{}], got {}",
                    key,
                    allowed.join(", "),
                    value
                )],
            },
            Validator::Custom(f) => f(value, key),
        }
    }
}

/// Check that `value` is a CIDR block written with its network address
pub fn validate_cidr_network_address(key: &str, value: &str) -> Result<(), String> {
    if !value.contains('/') {
        return Err(format!("{} must contain a valid CIDR, got {:?}", key, value));
    }
    match cidr::IpCidr::from_str(value) {
        Ok(_) => Ok(()),
        Err(e) => {
            if cidr::IpInet::from_str(value).is_ok() {
                Err(format!(
                    "{} must contain a valid network CIDR, got {:?}",
                    key, value
                ))
            } else {
                Err(format!(
                    "{} must contain a valid CIDR, got error parsing: {}",
                    key, e
                ))
            }
        }
    }
}

/// Whether a string still carries an unresolved `${...}` reference
pub fn contains_reference(value: &str) -> bool {
    value.contains("${")
}

/// One attribute of a schema
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: &'static str,
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub deprecated: Option<&'static str>,
    pub validator: Option<Validator>,
}

impl Attribute {
    fn new(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            name,
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            deprecated: None,
            validator: None,
        }
    }

    /// Attribute the user must set
    pub fn required(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(name, attr_type)
        }
    }

    /// Attribute the user may set
    pub fn optional(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(name, attr_type)
        }
    }

    /// Attribute filled in by the provider only
    pub fn computed(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(name, attr_type)
        }
    }

    /// Mark an optional attribute as also computed by the provider when unset
    pub fn with_computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn deprecated(mut self, message: &'static str) -> Self {
        self.deprecated = Some(message);
        self
    }

    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Attribute the user can never set
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    fn check_type(&self, value: &Value) -> bool {
        match self.attr_type {
            AttributeType::String => value.is_string(),
            AttributeType::Int => value.is_i64() || value.is_u64(),
            AttributeType::Bool => value.is_boolean(),
            AttributeType::List => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            AttributeType::Map => value
                .as_object()
                .is_some_and(|m| m.values().all(Value::is_string)),
            AttributeType::ObjectList => value.is_array(),
        }
    }
}

/// Ordered set of attributes
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Validate a desired configuration, returning every problem found
    pub fn validate(&self, config: &Map<String, Value>) -> Vec<String> {
        let mut errors = Vec::new();

        for key in config.keys() {
            if self.attribute(key).is_none() {
                errors.push(format!("unsupported argument {:?}", key));
            }
        }

        for attr in &self.attributes {
            let Some(value) = config.get(attr.name) else {
                if attr.required {
                    errors.push(format!("missing required argument {:?}", attr.name));
                }
                continue;
            };

            if attr.is_computed_only() {
                errors.push(format!(
                    "{:?} is computed by the provider and cannot be set",
                    attr.name
                ));
                continue;
            }

            if let Some(message) = attr.deprecated {
                tracing::warn!(attribute = attr.name, "{}", message);
            }

            // References are checked once they resolve at apply time
            if value.as_str().is_some_and(contains_reference) {
                continue;
            }

            if !attr.check_type(value) {
                errors.push(format!(
                    "{:?} must be of type {}, got {}",
                    attr.name, attr.attr_type, value
                ));
                continue;
            }

            if let Some(validator) = &attr.validator {
                errors.extend(validator.check(attr.name, value));
            }
        }

        errors
    }
}
