pub mod credentials;
pub mod error;

pub use credentials::{
    CredentialOverrides, Profile, ResolvedCredentials, credentials_path, resolve_credentials,
    resolve_credentials_with,
};
pub use error::*;

use std::path::PathBuf;

const CONFIG_PATH_ENV: &str = "ALIFORM_CONFIG_PATH";
const PROJECT_DIR: &str = ".aliform";
const CANDIDATES: [&str; 4] = ["infra.local.kdl", ".infra.local.kdl", "infra.kdl", ".infra.kdl"];

/// aliform's user configuration directory, created on demand
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("aliform");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the project's declaration file
///
/// Search order:
/// 1. `ALIFORM_CONFIG_PATH`
/// 2. current directory: infra.local.kdl, .infra.local.kdl, infra.kdl, .infra.kdl
/// 3. the same names inside `./.aliform/`
/// 4. `~/.config/aliform/infra.kdl`
pub fn find_infra_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points at a missing file: {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_dir = current_dir.join(PROJECT_DIR);
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("aliform").join("infra.kdl");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::InfraFileNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("aliform"));
        assert!(config_dir.exists());
    }

    #[test]
    #[serial]
    fn test_find_infra_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        fs::write(temp_dir.path().join("infra.kdl"), "// test").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_infra_file();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("infra.kdl"));
    }

    #[test]
    #[serial]
    fn test_local_file_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        fs::write(temp_dir.path().join("infra.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join(".infra.local.kdl"), "// local").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_infra_file();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".infra.local.kdl"));
    }

    #[test]
    #[serial]
    fn test_find_infra_file_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        let project_dir = temp_dir.path().join(".aliform");
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("infra.kdl"), "// nested").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_infra_file();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with(".aliform/infra.kdl"));
    }

    #[test]
    #[serial]
    fn test_find_infra_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "// custom").unwrap();

        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        }
        let result = find_infra_file();
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_find_infra_file_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = find_infra_file();
        std::env::set_current_dir(original_dir).unwrap();

        // a global ~/.config/aliform/infra.kdl would legitimately be found
        let global_exists = dirs::config_dir()
            .map(|d| d.join("aliform/infra.kdl").exists())
            .unwrap_or(false);
        if !global_exists {
            assert!(matches!(result, Err(ConfigError::InfraFileNotFound)));
        }
    }
}
