use crate::engine::Engine;
use crate::project::Project;
use colored::Colorize;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    project.print_header();
    let provider = project.provider()?;
    let engine = Engine::new(provider.as_ref(), &project.infra);

    // Refreshed state is only used for the diff; plan never writes it
    let mut state = project.state_manager().load().await?;
    println!("{}", "Refreshing state...".blue());
    for address in engine.refresh(&mut state).await? {
        println!("  {} {} no longer exists", "!".yellow(), address.cyan());
    }

    let plan = engine.plan(&state)?;
    println!();
    super::print_plan(&plan);
    Ok(())
}
