use crate::engine::Engine;
use crate::project::Project;
use colored::Colorize;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let provider = project.provider()?;
    let engine = Engine::new(provider.as_ref(), &project.infra);
    let dropped = engine.refresh(&mut state).await?;
    manager.save(&mut state).await?;
    lock.release().await?;

    for address in &dropped {
        println!("  {} {} no longer exists and was removed from state", "-".red(), address.cyan());
    }
    println!(
        "{} Refreshed {} resource(s)",
        "✓".green(),
        state.resources.keys().filter(|a| !a.starts_with("data.")).count()
    );
    Ok(())
}
