use crate::project::Project;
use colored::Colorize;

pub async fn list(project: &Project) -> anyhow::Result<()> {
    let state = project.state_manager().load().await?;
    if state.resources.is_empty() {
        println!("{}", "No resources in state.".dimmed());
        return Ok(());
    }
    for (address, resource) in &state.resources {
        println!("{}  {}", address.cyan(), resource.id.dimmed());
    }
    Ok(())
}

pub async fn show(project: &Project, address: &str) -> anyhow::Result<()> {
    let state = project.state_manager().load().await?;
    let resource = state
        .get_resource(address)
        .ok_or_else(|| aliform_cloud::CloudError::ResourceNotFound(address.to_string()))?;
    println!("{}", serde_json::to_string_pretty(resource)?);
    Ok(())
}
