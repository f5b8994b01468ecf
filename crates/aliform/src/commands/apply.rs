use crate::engine::Engine;
use crate::project::Project;
use aliform_cloud::CloudProvider;
use colored::Colorize;

#[tracing::instrument(skip(project))]
pub async fn handle(project: &Project, yes: bool) -> anyhow::Result<()> {
    project.print_header();

    let provider = project.provider()?;
    run(project, provider.as_ref(), yes).await
}

pub(crate) async fn run(
    project: &Project,
    provider: &dyn CloudProvider,
    yes: bool,
) -> anyhow::Result<()> {
    let engine = Engine::new(provider, &project.infra);
    let errors = engine.validate();
    if !errors.is_empty() {
        anyhow::bail!("invalid declarations:\n  {}", errors.join("\n  "));
    }

    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    println!("{}", "Refreshing state...".blue());
    for address in engine.refresh(&mut state).await? {
        println!("  {} {} no longer exists", "!".yellow(), address.cyan());
    }

    let plan = engine.plan(&state)?;
    println!();
    super::print_plan(&plan);

    // Reading data sources alone needs no confirmation
    if plan.has_changes && !yes {
        println!();
        println!("Run again with {} to apply these changes", "--yes".bold());
        manager.save(&mut state).await?;
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", "Applying...".blue().bold());
    let result = engine.apply(&plan, &mut state, &manager).await;
    engine.prune_data(&mut state);
    manager.save(&mut state).await?;
    lock.release().await?;

    super::report(&result)
}
