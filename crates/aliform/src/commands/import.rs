use crate::engine::Engine;
use crate::project::Project;
use colored::Colorize;

#[tracing::instrument(skip(project))]
pub async fn handle(project: &Project, address: &str, id: &str) -> anyhow::Result<()> {
    let manager = project.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let provider = project.provider()?;
    let engine = Engine::new(provider.as_ref(), &project.infra);
    let imported = engine.import(address, id, &mut state).await?;
    manager.save(&mut state).await?;
    lock.release().await?;

    println!(
        "{} Imported {} ({})",
        "✓".green(),
        address.cyan(),
        imported.id
    );
    if project.infra.resource(address).is_none() {
        println!(
            "  {} {} is not declared; declare it or the next apply will destroy it",
            "!".yellow(),
            address
        );
    }
    Ok(())
}
