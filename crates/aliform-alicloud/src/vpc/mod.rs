//! VPC product: networks and their switches

pub mod api;
mod resource_vpc;
mod resource_vswitch;
pub mod service;

pub use resource_vpc::VpcResource;
pub use resource_vswitch::VSwitchResource;
pub use service::{Status, VpcService, find_system_route_table};

use serde_json::Value;

/// Names are 2 to 128 characters and cannot look like a URL
pub(crate) fn validate_name(value: &Value, key: &str) -> Vec<String> {
    let Some(name) = value.as_str() else {
        return vec![format!("{} must be a string", key)];
    };

    let mut errors = Vec::new();
    let len = name.chars().count();
    if !(2..=128).contains(&len) {
        errors.push(format!(
            "{} must contain between 2 and 128 characters, got {}",
            key, len
        ));
    }
    if name.starts_with("http://") || name.starts_with("https://") {
        errors.push(format!("{} cannot start with http:// or https://", key));
    }
    errors
}
