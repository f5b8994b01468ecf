use crate::engine::Engine;
use crate::project::{PROVIDER_KEYS, Project};
use colored::Colorize;

pub fn handle(project: &Project) -> anyhow::Result<()> {
    println!("{}", "Validating declarations...".blue());
    project.print_header();

    let provider = project.offline_provider();
    let mut errors = Engine::new(provider.as_ref(), &project.infra).validate();

    for block in &project.infra.providers {
        if block.name != provider.name() {
            errors.push(format!("provider {:?} is not supported", block.name));
            continue;
        }
        for key in block.config.keys() {
            if !PROVIDER_KEYS.contains(&key.as_str()) {
                errors.push(format!("provider {:?}: unsupported setting {:?}", block.name, key));
            }
        }
    }

    if !errors.is_empty() {
        eprintln!();
        eprintln!("{}", "✗ Invalid declarations".red().bold());
        for error in &errors {
            eprintln!("  • {}", error);
        }
        anyhow::bail!("{} problem(s) found", errors.len());
    }

    let infra = &project.infra;
    println!("{}", "✓ Declarations are valid".green().bold());
    println!();
    println!("  Resources: {}", infra.resources.len());
    for block in &infra.resources {
        println!("    - {}", block.address().cyan());
    }
    if !infra.data.is_empty() {
        println!("  Data sources: {}", infra.data.len());
        for block in &infra.data {
            println!("    - {}", block.address().cyan());
        }
    }
    Ok(())
}
