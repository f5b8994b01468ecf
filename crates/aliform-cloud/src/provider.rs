//! Cloud provider and resource lifecycle traits

use crate::error::Result;
use crate::resource::ResourceData;
use crate::schema::Schema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle contract of a managed resource
///
/// Every function receives the [`ResourceData`] for one resource instance.
/// `read` clears the id when the remote object no longer exists instead of
/// returning an error.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource type name (e.g., "alicloud_vpc")
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn create(&self, d: &mut ResourceData) -> Result<()>;

    async fn read(&self, d: &mut ResourceData) -> Result<()>;

    async fn update(&self, d: &mut ResourceData) -> Result<()>;

    async fn delete(&self, d: &mut ResourceData) -> Result<()>;

    /// Adopt an existing remote object
    ///
    /// The default passes the id through and reads the object.
    async fn import(&self, id: &str) -> Result<ResourceData> {
        let mut d = ResourceData::default();
        d.set_id(id);
        self.read(&mut d).await?;
        Ok(d)
    }
}

/// Read-only lookup of remote objects
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Data source type name (e.g., "alicloud_db_instances")
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, d: &mut ResourceData) -> Result<()>;
}

/// Cloud provider abstraction trait
///
/// A provider owns an authenticated API client and hands out the resources
/// and data sources it implements.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "alicloud")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    fn resource(&self, type_name: &str) -> Option<Arc<dyn Resource>>;

    fn data_source(&self, type_name: &str) -> Option<Arc<dyn DataSource>>;

    fn resource_types(&self) -> Vec<&'static str>;

    fn data_source_types(&self) -> Vec<&'static str>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/region information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Back-off configuration for retried operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Same delay before every attempt
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before the attempt following `attempt` (0-based), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        // Past a few dozen attempts the product overflows Duration; that is max_delay anyway
        Duration::try_from_secs_f64(secs).map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}
