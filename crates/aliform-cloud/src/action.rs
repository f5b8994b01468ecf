//! Planned actions and the desired/prior diff

use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Represents a planned action for one declared block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Address of the block (e.g., "alicloud_vpc.default")
    pub address: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource or data source type (e.g., "alicloud_vpc")
    pub resource_type: String,

    /// Remote id when the resource already exists
    pub resource_id: Option<String>,

    /// Attribute-level changes
    pub changes: Vec<AttributeChange>,
}

impl Action {
    pub fn new(
        address: impl Into<String>,
        resource_type: impl Into<String>,
        action_type: ActionType,
    ) -> Self {
        Self {
            address: address.into(),
            action_type,
            resource_type: resource_type.into(),
            resource_id: None,
            changes: Vec::new(),
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_changes(mut self, changes: Vec<AttributeChange>) -> Self {
        self.changes = changes;
        self
    }

    /// One-line description for plan output
    pub fn description(&self) -> String {
        match self.action_type {
            ActionType::Create => format!("{} will be created", self.address),
            ActionType::Update => format!("{} will be updated in-place", self.address),
            ActionType::Replace => format!("{} must be replaced", self.address),
            ActionType::Delete => format!("{} will be destroyed", self.address),
            ActionType::Read => format!("{} will be read", self.address),
            ActionType::NoOp => format!("{} is up-to-date", self.address),
        }
    }
}

/// A single attribute difference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
    /// The change forces the resource to be replaced
    pub forces_replacement: bool,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource in place
    Update,
    /// Delete and re-create a resource
    Replace,
    /// Delete a resource
    Delete,
    /// Read a data source
    Read,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::Read => write!(f, "read"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        _ => false,
    }
}

/// Compare a desired configuration against prior state
///
/// `prior` is `None` when the resource does not exist yet. Computed-only
/// attributes never produce a change; optional+computed attributes only do
/// when the desired configuration sets them.
pub fn diff(
    schema: &Schema,
    desired: &Map<String, Value>,
    prior: Option<&Map<String, Value>>,
) -> (ActionType, Vec<AttributeChange>) {
    let Some(prior) = prior else {
        let changes = schema
            .attributes()
            .filter_map(|attr| {
                desired.get(attr.name).map(|after| AttributeChange {
                    name: attr.name.to_string(),
                    before: None,
                    after: Some(after.clone()),
                    forces_replacement: false,
                })
            })
            .collect();
        return (ActionType::Create, changes);
    };

    let mut changes = Vec::new();
    for attr in schema.attributes() {
        if attr.is_computed_only() {
            continue;
        }

        let before = prior.get(attr.name);
        let after = desired.get(attr.name);
        let changed = match after {
            Some(after) => before != Some(after) && !(is_blank(before) && is_blank(Some(after))),
            // Unset optional attributes only matter when the provider does not fill them in
            None => !attr.computed && !is_blank(before),
        };

        if changed {
            changes.push(AttributeChange {
                name: attr.name.to_string(),
                before: before.cloned(),
                after: after.cloned(),
                forces_replacement: attr.force_new,
            });
        }
    }

    let action = if changes.is_empty() {
        ActionType::NoOp
    } else if changes.iter().any(|c| c.forces_replacement) {
        ActionType::Replace
    } else {
        ActionType::Update
    };
    (action, changes)
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, address: String, message: String) {
        self.succeeded.push(ActionResult {
            address,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, address: String, error: String) {
        self.failed.push(ActionResult {
            address,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Address of the block the action applied to
    pub address: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions
            .iter()
            .any(|a| !matches!(a.action_type, ActionType::NoOp | ActionType::Read));
        Self {
            actions,
            has_changes,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        let replace = self.actions_by_type(ActionType::Replace).len();
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len() + replace,
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len() + replace,
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to add, {} to change, {} to destroy, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}
