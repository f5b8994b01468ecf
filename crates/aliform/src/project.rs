use aliform_alicloud::{AlicloudProvider, ClientConfig, Credentials, Product};
use aliform_cloud::{CloudProvider, StateManager};
use aliform_config::CredentialOverrides;
use aliform_core::{Infra, ProviderBlock};
use anyhow::Context;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PROVIDER_NAME: &str = "alicloud";
const DEFAULT_REGION: &str = "cn-hangzhou";

/// Settings accepted in the `provider "alicloud"` block
pub const PROVIDER_KEYS: &[&str] = &[
    "access_key",
    "secret_key",
    "security_token",
    "region",
    "profile",
    "endpoints",
];

/// A loaded declaration file and the directory its state lives in
pub struct Project {
    pub root: PathBuf,
    pub infra_file: PathBuf,
    pub infra: Infra,
}

impl Project {
    /// Load `file`, or the declaration file found by the usual search
    pub fn load(file: Option<PathBuf>) -> anyhow::Result<Self> {
        let infra_file = match file {
            Some(path) => path,
            None => aliform_config::find_infra_file()
                .context("no declaration file found (looked for infra.kdl)")?,
        };
        let infra = aliform_core::load_infra(&infra_file)?;
        let root = project_root(&infra_file);
        tracing::debug!(root = %root.display(), "Project root");

        Ok(Self {
            root,
            infra_file,
            infra,
        })
    }

    pub fn state_manager(&self) -> StateManager {
        StateManager::new(&self.root)
    }

    pub fn provider_block(&self) -> Option<&ProviderBlock> {
        self.infra.provider(PROVIDER_NAME)
    }

    /// Authenticated provider built from the provider block and credentials
    pub fn provider(&self) -> anyhow::Result<Arc<dyn CloudProvider>> {
        let config = client_config(self.provider_block())?;
        let provider = AlicloudProvider::new(config)?;
        Ok(Arc::new(provider))
    }

    /// Provider good for schemas only
    pub fn offline_provider(&self) -> Arc<dyn CloudProvider> {
        let region = self
            .provider_block()
            .and_then(|p| p.get_str("region"))
            .unwrap_or(DEFAULT_REGION);
        Arc::new(AlicloudProvider::offline(region))
    }

    pub fn print_header(&self) {
        println!(
            "📄 {}",
            self.infra_file.display().to_string().cyan()
        );
    }
}

/// State lives next to the declaration file, or next to `.aliform/`
fn project_root(infra_file: &Path) -> PathBuf {
    let dir = infra_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if dir.file_name().is_some_and(|name| name == ".aliform") {
        dir.parent().map(Path::to_path_buf).unwrap_or(dir)
    } else {
        dir
    }
}

/// Build the API client configuration
///
/// Credentials come from the provider block, then the environment, then
/// the credentials profile.
pub fn client_config(block: Option<&ProviderBlock>) -> anyhow::Result<ClientConfig> {
    let setting = |key: &str| block.and_then(|b| b.get_str(key)).map(str::to_string);
    let overrides = CredentialOverrides {
        access_key: setting("access_key"),
        secret_key: setting("secret_key"),
        security_token: setting("security_token"),
        region: setting("region"),
        profile: setting("profile"),
    };
    let resolved = aliform_config::resolve_credentials(&overrides)?;

    let mut credentials = Credentials::new(resolved.access_key, resolved.secret_key);
    if let Some(token) = resolved.security_token {
        credentials = credentials.with_security_token(token);
    }
    let mut config = ClientConfig::new(resolved.region, credentials);

    if let Some(endpoints) = block
        .and_then(|b| b.config.get("endpoints"))
        .and_then(|v| v.as_object())
    {
        for (name, value) in endpoints {
            let product = match name.as_str() {
                "vpc" => Product::Vpc,
                "rds" => Product::Rds,
                other => anyhow::bail!("unknown endpoint {:?} (expected vpc or rds)", other),
            };
            let endpoint = value
                .as_str()
                .with_context(|| format!("endpoint {:?} must be a string", name))?;
            config = config.with_endpoint(product, endpoint);
        }
    }

    Ok(config)
}
