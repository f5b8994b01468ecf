use crate::engine::Engine;
use crate::project::Project;

pub async fn handle(project: &Project, address: &str) -> anyhow::Result<()> {
    let state = project.state_manager().load().await?;
    let provider = project.provider()?;
    let engine = Engine::new(provider.as_ref(), &project.infra);

    let (_, attributes, _) = engine.read_data(address, &state).await?;
    println!("{}", serde_json::to_string_pretty(&attributes)?);
    Ok(())
}
