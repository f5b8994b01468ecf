use crate::engine::Engine;
use crate::project::Project;
use colored::Colorize;

#[tracing::instrument(skip(project))]
pub async fn handle(project: &Project, address: Option<&str>, yes: bool) -> anyhow::Result<()> {
    project.print_header();

    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let provider = project.provider()?;
    let engine = Engine::new(provider.as_ref(), &project.infra);
    let plan = engine.destroy_plan(&state, address)?;

    if plan.actions.is_empty() {
        println!("{}", "Nothing to destroy.".green());
        lock.release().await?;
        return Ok(());
    }

    super::print_plan(&plan);

    if !yes {
        println!();
        println!(
            "{}",
            "Warning: the resources above will be permanently deleted.".yellow()
        );
        println!("Run again with {} to destroy them", "--yes".bold());
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", "Destroying...".red().bold());
    let result = engine.apply(&plan, &mut state, &manager).await;
    if address.is_none() && result.is_success() {
        state.resources.retain(|a, _| !a.starts_with("data."));
    }
    manager.save(&mut state).await?;
    lock.release().await?;

    super::report(&result)
}
