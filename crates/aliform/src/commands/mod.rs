pub mod apply;
pub mod data;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod state;
pub mod validate;

use aliform_cloud::{ActionType, ApplyResult, AttributeChange, Plan};
use colored::Colorize;
use serde_json::Value;

fn show_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "(unset)".dimmed().to_string(),
        Some(Value::String(s)) => format!("{:?}", s),
        Some(other) => other.to_string(),
    }
}

fn print_change(change: &AttributeChange) {
    let line = format!(
        "      {}: {} → {}",
        change.name,
        show_value(change.before.as_ref()),
        show_value(change.after.as_ref())
    );
    if change.forces_replacement {
        println!("{} {}", line, "(forces replacement)".red());
    } else {
        println!("{}", line);
    }
}

/// Print every action that does something, then the summary
pub fn print_plan(plan: &Plan) {
    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green().bold(),
            ActionType::Update => "~".yellow().bold(),
            ActionType::Replace => "-/+".red().bold(),
            ActionType::Delete => "-".red().bold(),
            ActionType::Read => "<=".cyan().bold(),
            ActionType::NoOp => continue,
        };
        let id = action
            .resource_id
            .as_deref()
            .map(|id| format!(" ({})", id).dimmed().to_string())
            .unwrap_or_default();
        println!("  {} {}{}", marker, action.description(), id);
        for change in &action.changes {
            print_change(change);
        }
    }

    println!();
    if plan.has_changes {
        println!("{} {}", "Plan:".bold(), plan.summary());
    } else {
        println!("{}", "No changes. Infrastructure matches the declarations.".green());
    }
}

/// Print per-address outcomes; errors if anything failed
pub fn report(result: &ApplyResult) -> anyhow::Result<()> {
    for done in &result.succeeded {
        println!("  {} {}: {}", "✓".green(), done.address.cyan(), done.message);
    }
    for failed in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failed.address.cyan(),
            failed.error.as_deref().unwrap_or("failed")
        );
    }

    println!();
    if result.is_success() {
        println!(
            "{} ({} actions, {:.1}s)",
            "✓ Complete".green().bold(),
            result.succeeded.len(),
            result.duration_ms as f64 / 1000.0
        );
        Ok(())
    } else {
        anyhow::bail!("{} action(s) failed", result.failed.len())
    }
}
