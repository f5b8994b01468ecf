//! Credential resolution
//!
//! Each field is resolved on its own; the first source that has it wins:
//! 1. explicit values from the provider block
//! 2. environment variables (`ALICLOUD_*`)
//! 3. the profile selected by `ALICLOUD_PROFILE` (default `default`) in
//!    `~/.config/aliform/credentials.yaml`

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const ENV_ACCESS_KEY: &str = "ALICLOUD_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "ALICLOUD_SECRET_KEY";
pub const ENV_SECURITY_TOKEN: &str = "ALICLOUD_SECURITY_TOKEN";
pub const ENV_REGION: &str = "ALICLOUD_REGION";
pub const ENV_PROFILE: &str = "ALICLOUD_PROFILE";

const DEFAULT_PROFILE: &str = "default";
const CREDENTIALS_FILE: &str = "credentials.yaml";

/// Values set explicitly, typically in the `provider "alicloud"` block
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub security_token: Option<String>,
    pub region: Option<String>,
    pub profile: Option<String>,
}

/// Fully resolved credentials
#[derive(Clone, PartialEq)]
pub struct ResolvedCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub security_token: Option<String>,
    pub region: String,
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("region", &self.region)
            .finish()
    }
}

/// One entry of `credentials.yaml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub security_token: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    profiles: BTreeMap<String, Profile>,
}

/// Location of the shared credentials file
pub fn credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aliform").join(CREDENTIALS_FILE))
}

/// Load a profile; a missing file yields `None`, a missing profile an error
pub fn load_profile(path: &Path, name: &str) -> Result<Option<Profile>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let file: CredentialsFile = serde_yaml::from_str(&content)?;
    match file.profiles.get(name) {
        Some(profile) => Ok(Some(profile.clone())),
        None => Err(ConfigError::ProfileNotFound(
            name.to_string(),
            path.display().to_string(),
        )),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn env(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

/// Resolve credentials using the shared credentials file
pub fn resolve_credentials(overrides: &CredentialOverrides) -> Result<ResolvedCredentials> {
    resolve_credentials_with(overrides, credentials_path().as_deref())
}

/// Resolve credentials reading profiles from `profiles_path`
pub fn resolve_credentials_with(
    overrides: &CredentialOverrides,
    profiles_path: Option<&Path>,
) -> Result<ResolvedCredentials> {
    let profile_name = non_empty(overrides.profile.clone())
        .or_else(|| env(ENV_PROFILE))
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    let explicitly_named = overrides.profile.is_some() || env(ENV_PROFILE).is_some();
    let profile = match profiles_path {
        Some(path) => match load_profile(path, &profile_name) {
            Ok(profile) => profile.unwrap_or_default(),
            // Only a profile the user asked for has to exist
            Err(ConfigError::ProfileNotFound(..)) if !explicitly_named => Profile::default(),
            Err(e) => return Err(e),
        },
        None => Profile::default(),
    };

    let pick = |explicit: &Option<String>, env_name: &str, from_profile: &Option<String>| {
        non_empty(explicit.clone())
            .or_else(|| env(env_name))
            .or_else(|| non_empty(from_profile.clone()))
    };

    let access_key = pick(&overrides.access_key, ENV_ACCESS_KEY, &profile.access_key)
        .ok_or_else(|| ConfigError::MissingCredentials("access key".to_string()))?;
    let secret_key = pick(&overrides.secret_key, ENV_SECRET_KEY, &profile.secret_key)
        .ok_or_else(|| ConfigError::MissingCredentials("secret key".to_string()))?;
    let region = pick(&overrides.region, ENV_REGION, &profile.region)
        .ok_or_else(|| ConfigError::MissingCredentials("region".to_string()))?;
    let security_token = pick(
        &overrides.security_token,
        ENV_SECURITY_TOKEN,
        &profile.security_token,
    );

    tracing::debug!(profile = %profile_name, %region, "Resolved credentials");
    Ok(ResolvedCredentials {
        access_key,
        secret_key,
        security_token,
        region,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const PROFILES: &str = r#"
profiles:
  default:
    access_key: AK_DEFAULT
    secret_key: SK_DEFAULT
    region: cn-hangzhou
  staging:
    access_key: AK_STAGING
    secret_key: SK_STAGING
    security_token: STS_STAGING
    region: cn-beijing
"#;

    fn clear_env() {
        unsafe {
            for name in [
                ENV_ACCESS_KEY,
                ENV_SECRET_KEY,
                ENV_SECURITY_TOKEN,
                ENV_REGION,
                ENV_PROFILE,
            ] {
                std::env::remove_var(name);
            }
        }
    }

    fn profiles_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.yaml");
        fs::write(&path, PROFILES).unwrap();
        (dir, path)
    }

    #[test]
    #[serial]
    fn test_explicit_values_win() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_ACCESS_KEY, "AK_ENV");
        }
        let (_dir, path) = profiles_file();

        let overrides = CredentialOverrides {
            access_key: Some("AK_EXPLICIT".to_string()),
            ..Default::default()
        };
        let creds = resolve_credentials_with(&overrides, Some(&path)).unwrap();
        assert_eq!(creds.access_key, "AK_EXPLICIT");
        assert_eq!(creds.secret_key, "SK_DEFAULT");
        assert_eq!(creds.region, "cn-hangzhou");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_beats_profile() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_ACCESS_KEY, "AK_ENV");
            std::env::set_var(ENV_REGION, "cn-shanghai");
        }
        let (_dir, path) = profiles_file();

        let creds = resolve_credentials_with(&CredentialOverrides::default(), Some(&path)).unwrap();
        assert_eq!(creds.access_key, "AK_ENV");
        assert_eq!(creds.secret_key, "SK_DEFAULT");
        assert_eq!(creds.region, "cn-shanghai");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_profile_from_env() {
        clear_env();
        unsafe {
            std::env::set_var(ENV_PROFILE, "staging");
        }
        let (_dir, path) = profiles_file();

        let creds = resolve_credentials_with(&CredentialOverrides::default(), Some(&path)).unwrap();
        assert_eq!(creds.access_key, "AK_STAGING");
        assert_eq!(creds.security_token.as_deref(), Some("STS_STAGING"));
        assert_eq!(creds.region, "cn-beijing");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_named_profile_is_an_error() {
        clear_env();
        let (_dir, path) = profiles_file();

        let overrides = CredentialOverrides {
            profile: Some("prod".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_credentials_with(&overrides, Some(&path)),
            Err(ConfigError::ProfileNotFound(..))
        ));
    }

    #[test]
    #[serial]
    fn test_missing_credentials() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.yaml");

        match resolve_credentials_with(&CredentialOverrides::default(), Some(&missing)) {
            Err(ConfigError::MissingCredentials(what)) => assert_eq!(what, "access key"),
            other => panic!("expected MissingCredentials, got {:?}", other),
        }

        let overrides = CredentialOverrides {
            access_key: Some("AK".to_string()),
            secret_key: Some("SK".to_string()),
            ..Default::default()
        };
        match resolve_credentials_with(&overrides, None) {
            Err(ConfigError::MissingCredentials(what)) => assert_eq!(what, "region"),
            other => panic!("expected MissingCredentials, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = ResolvedCredentials {
            access_key: "AK".to_string(),
            secret_key: "very-secret".to_string(),
            security_token: None,
            region: "cn-hangzhou".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("very-secret"));
    }
}
