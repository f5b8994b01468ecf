//! Alibaba Cloud provider implementation

use crate::client::{AliyunClient, ClientConfig, OfflineApi, RpcApi, call};
use crate::error::Result;
use crate::rds::DbInstancesDataSource;
use crate::vpc::api::DescribeRegions;
use crate::vpc::{VSwitchResource, VpcResource};
use aliform_cloud::{AuthStatus, CloudProvider, DataSource, Resource};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Alibaba Cloud provider
pub struct AlicloudProvider {
    api: Arc<dyn RpcApi>,
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
}

impl AlicloudProvider {
    /// Create a provider talking to the real API
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = AliyunClient::new(config)?;
        Ok(Self::with_api(Arc::new(client)))
    }

    /// Create a provider over any transport
    pub fn with_api(api: Arc<dyn RpcApi>) -> Self {
        let resources: Vec<Arc<dyn Resource>> = vec![
            Arc::new(VpcResource::new(api.clone())),
            Arc::new(VSwitchResource::new(api.clone())),
        ];
        let data_sources: Vec<Arc<dyn DataSource>> =
            vec![Arc::new(DbInstancesDataSource::new(api.clone()))];

        Self {
            api,
            resources: resources.into_iter().map(|r| (r.type_name(), r)).collect(),
            data_sources: data_sources.into_iter().map(|d| (d.type_name(), d)).collect(),
        }
    }

    /// Provider whose API calls all fail; enough for schemas and validation
    pub fn offline(region: impl Into<String>) -> Self {
        Self::with_api(Arc::new(OfflineApi::new(region)))
    }

    pub fn region(&self) -> &str {
        self.api.region()
    }
}

#[async_trait]
impl CloudProvider for AlicloudProvider {
    fn name(&self) -> &str {
        "alicloud"
    }

    fn display_name(&self) -> &str {
        "Alibaba Cloud"
    }

    async fn check_auth(&self) -> aliform_cloud::Result<AuthStatus> {
        match call(&*self.api, &DescribeRegions).await {
            Ok(response) => {
                let region = self.region();
                let known = response.regions.region.iter().any(|r| r.region_id == region);
                if !known {
                    tracing::warn!(region, "Region is not listed by DescribeRegions");
                }
                Ok(AuthStatus::ok(format!(
                    "region {} ({} regions available)",
                    region,
                    response.regions.region.len()
                )))
            }
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    fn resource(&self, type_name: &str) -> Option<Arc<dyn Resource>> {
        self.resources.get(type_name).cloned()
    }

    fn data_source(&self, type_name: &str) -> Option<Arc<dyn DataSource>> {
        self.data_sources.get(type_name).cloned()
    }

    fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    fn data_source_types(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }
}
