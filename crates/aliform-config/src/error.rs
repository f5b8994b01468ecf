use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error(
        "No declaration file found. Looked in:\n\
        - current directory: infra.local.kdl, .infra.local.kdl, infra.kdl, .infra.kdl\n\
        - ./.aliform/ directory\n\
        - ~/.config/aliform/infra.kdl\n\
        Set ALIFORM_CONFIG_PATH to point at a file directly"
    )]
    InfraFileNotFound,

    #[error(
        "Missing credentials: {0}. Set it in the provider block, via environment \
        variables (ALICLOUD_ACCESS_KEY, ALICLOUD_SECRET_KEY, ALICLOUD_REGION) or in \
        ~/.config/aliform/credentials.yaml"
    )]
    MissingCredentials(String),

    #[error("Profile {0:?} not found in {1}")]
    ProfileNotFound(String, String),

    #[error("Invalid credentials file: {0}")]
    InvalidCredentialsFile(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
