//! Lookups and status waits shared by the VPC resources

use super::api::{
    DescribeRouteTables, DescribeVSwitchAttributes, DescribeVpcAttribute, RouteTable,
    VSwitchAttributes, VpcAttribute,
};
use crate::client::{DEFAULT_INTERVAL, PAGE_SIZE_LARGE, RpcApi, call};
use crate::error::{AlicloudError, Result, codes};
use aliform_cloud::{RetryConfig, RetryError, WaitStatus, retry_with, wait_for};
use std::sync::Arc;
use std::time::Duration;

const ROUTE_TABLE_TIMEOUT: Duration = Duration::from_secs(6 * 60);
const THROTTLING_DELAY: Duration = Duration::from_secs(10);

/// Lifecycle status of a VPC object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Available,
    /// The object no longer exists
    Deleted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Available => "Available",
            Status::Deleted => "Deleted",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last route table of type `System`; the system table is normally listed last
pub fn find_system_route_table(tables: &[RouteTable]) -> Option<&RouteTable> {
    tables.iter().rev().find(|t| t.route_table_type == "System")
}

pub struct VpcService {
    api: Arc<dyn RpcApi>,
}

impl VpcService {
    pub fn new(api: Arc<dyn RpcApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &dyn RpcApi {
        &*self.api
    }

    /// Describe a VPC, mapping every flavour of absence to [`AlicloudError::NotFound`]
    #[tracing::instrument(skip(self))]
    pub async fn describe_vpc(&self, id: &str) -> Result<VpcAttribute> {
        let request = DescribeVpcAttribute {
            vpc_id: id.to_string(),
        };
        let not_found = || AlicloudError::NotFound {
            resource: "Vpc",
            id: id.to_string(),
        };

        let vpc = match call(self.api(), &request).await {
            Ok(vpc) => vpc,
            Err(e) if e.is_not_found() => return Err(not_found()),
            Err(e) => return Err(e.context(format!("describing vpc {}", id))),
        };

        // The API answers unknown ids with an empty body
        if vpc.vpc_id != id {
            return Err(not_found());
        }
        Ok(vpc)
    }

    /// Poll until the VPC reaches `status`; [`Status::Deleted`] is reached once it is gone
    pub async fn wait_for_vpc(&self, id: &str, status: Status, timeout: Duration) -> Result<()> {
        let description = format!("vpc {} to become {}", id, status);
        wait_for(&description, timeout, DEFAULT_INTERVAL, move || async move {
            match self.describe_vpc(id).await {
                Ok(vpc) if vpc.status == status.as_str() => Ok(WaitStatus::Reached),
                Ok(vpc) => Ok(WaitStatus::Pending(vpc.status)),
                Err(e) if e.is_not_found() && status == Status::Deleted => Ok(WaitStatus::Reached),
                Err(e) => Err(e),
            }
        })
        .await
    }

    /// All route tables of a virtual router, one page at a time
    #[tracing::instrument(skip(self))]
    pub async fn describe_route_tables(
        &self,
        v_router_id: &str,
        resource_group_id: &str,
    ) -> Result<Vec<RouteTable>> {
        let backoff = RetryConfig::fixed(THROTTLING_DELAY);
        let mut tables = Vec::new();
        let mut page_number = 1;

        loop {
            let request = DescribeRouteTables {
                v_router_id: v_router_id.to_string(),
                resource_group_id: resource_group_id.to_string(),
                page_number,
                page_size: PAGE_SIZE_LARGE,
            };
            let api = self.api();
            let req = &request;

            let page = retry_with(&backoff, ROUTE_TABLE_TIMEOUT, move || async move {
                call(api, req).await.map_err(|e| {
                    if e.is_expected_error(&[codes::THROTTLING]) {
                        RetryError::Retryable(e)
                    } else {
                        RetryError::NonRetryable(e)
                    }
                })
            })
            .await
            .map_err(|e| e.context(format!("listing route tables of {}", v_router_id)))?;

            let count = page.route_tables.route_table.len();
            tables.extend(page.route_tables.route_table);
            if count < PAGE_SIZE_LARGE {
                break;
            }
            page_number += 1;
        }

        tracing::debug!(count = tables.len(), "Listed route tables");
        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    pub async fn describe_vswitch(&self, id: &str) -> Result<VSwitchAttributes> {
        let request = DescribeVSwitchAttributes {
            v_switch_id: id.to_string(),
        };
        let not_found = || AlicloudError::NotFound {
            resource: "VSwitch",
            id: id.to_string(),
        };

        let vswitch = match call(self.api(), &request).await {
            Ok(vswitch) => vswitch,
            Err(e) if e.is_not_found() => return Err(not_found()),
            Err(e) => return Err(e.context(format!("describing vswitch {}", id))),
        };

        if vswitch.v_switch_id != id {
            return Err(not_found());
        }
        Ok(vswitch)
    }

    pub async fn wait_for_vswitch(
        &self,
        id: &str,
        status: Status,
        timeout: Duration,
    ) -> Result<()> {
        let description = format!("vswitch {} to become {}", id, status);
        wait_for(&description, timeout, DEFAULT_INTERVAL, move || async move {
            match self.describe_vswitch(id).await {
                Ok(vswitch) if vswitch.status == status.as_str() => Ok(WaitStatus::Reached),
                Ok(vswitch) => Ok(WaitStatus::Pending(vswitch.status)),
                Err(e) if e.is_not_found() && status == Status::Deleted => Ok(WaitStatus::Reached),
                Err(e) => Err(e),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use serde_json::json;
    use tokio::time::Instant;

    fn table(id: &str, kind: &str) -> RouteTable {
        RouteTable {
            route_table_id: id.to_string(),
            route_table_type: kind.to_string(),
            ..Default::default()
        }
    }

    fn tables_page(start: usize, count: usize) -> serde_json::Value {
        let tables: Vec<_> = (start..start + count)
            .map(|i| json!({ "RouteTableId": format!("vtb-{}", i), "RouteTableType": "Custom" }))
            .collect();
        json!({ "RouteTables": { "RouteTable": tables } })
    }

    #[test]
    fn test_find_system_route_table_prefers_last() {
        let tables = vec![
            table("vtb-1", "System"),
            table("vtb-2", "Custom"),
            table("vtb-3", "System"),
        ];
        assert_eq!(
            find_system_route_table(&tables).map(|t| t.route_table_id.as_str()),
            Some("vtb-3")
        );
        assert!(find_system_route_table(&[table("vtb-1", "Custom")]).is_none());
        assert!(find_system_route_table(&[]).is_none());
    }

    #[tokio::test]
    async fn test_describe_vpc_id_mismatch_is_not_found() {
        let api = FakeApi::new();
        api.ok("DescribeVpcAttribute", json!({ "VpcId": "", "RequestId": "r" }));
        let service = VpcService::new(api.clone());

        let err = service.describe_vpc("vpc-1").await.unwrap_err();
        assert!(matches!(err, AlicloudError::NotFound { .. }));

        let calls = api.calls_to("DescribeVpcAttribute");
        assert_eq!(calls[0].params["VpcId"], "vpc-1");
        assert_eq!(calls[0].params["RegionId"], "cn-hangzhou");
    }

    #[tokio::test]
    async fn test_describe_vpc_not_found_code() {
        let api = FakeApi::new();
        api.err("DescribeVpcAttribute", codes::FORBIDDEN_VPC_NOT_FOUND);
        let service = VpcService::new(api.clone());

        assert!(service.describe_vpc("vpc-1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_route_tables_paginate_until_short_page() {
        let api = FakeApi::new();
        api.ok("DescribeRouteTables", tables_page(0, PAGE_SIZE_LARGE))
            .ok("DescribeRouteTables", tables_page(PAGE_SIZE_LARGE, 3));
        let service = VpcService::new(api.clone());

        let tables = service.describe_route_tables("vrt-1", "").await.unwrap();
        assert_eq!(tables.len(), PAGE_SIZE_LARGE + 3);

        let calls = api.calls_to("DescribeRouteTables");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].params["PageNumber"], "1");
        assert_eq!(calls[1].params["PageNumber"], "2");
        assert_eq!(calls[1].params["PageSize"], "50");
        assert!(!calls[0].params.contains_key("ResourceGroupId"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_tables_retry_throttling() {
        let api = FakeApi::new();
        api.err("DescribeRouteTables", codes::THROTTLING)
            .err("DescribeRouteTables", codes::THROTTLING)
            .ok("DescribeRouteTables", tables_page(0, 1));
        let service = VpcService::new(api.clone());

        let start = Instant::now();
        let tables = service.describe_route_tables("vrt-1", "rg-1").await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(api.calls_to("DescribeRouteTables").len(), 3);
        assert!(start.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_tables_other_errors_fail_fast() {
        let api = FakeApi::new();
        api.err("DescribeRouteTables", "Forbidden.RAM");
        let service = VpcService::new(api.clone());

        let err = service.describe_route_tables("vrt-1", "").await.unwrap_err();
        assert_eq!(err.code(), Some("Forbidden.RAM"));
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_vpc_available() {
        let api = FakeApi::new();
        api.ok("DescribeVpcAttribute", json!({ "VpcId": "vpc-1", "Status": "Pending" }))
            .ok("DescribeVpcAttribute", json!({ "VpcId": "vpc-1", "Status": "Available" }));
        let service = VpcService::new(api.clone());

        service
            .wait_for_vpc("vpc-1", Status::Available, Duration::from_secs(120))
            .await
            .unwrap();
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_deleted_accepts_not_found() {
        let api = FakeApi::new();
        api.ok("DescribeVpcAttribute", json!({ "VpcId": "vpc-1", "Status": "Deleting" }))
            .err("DescribeVpcAttribute", codes::INVALID_VPC_ID_NOT_FOUND);
        let service = VpcService::new(api.clone());

        service
            .wait_for_vpc("vpc-1", Status::Deleted, Duration::from_secs(500))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_available_fails_when_gone() {
        let api = FakeApi::new();
        api.err("DescribeVpcAttribute", codes::INVALID_VPC_ID_NOT_FOUND);
        let service = VpcService::new(api.clone());

        let err = service
            .wait_for_vpc("vpc-1", Status::Available, Duration::from_secs(120))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_vswitch_times_out() {
        let api = FakeApi::new();
        api.ok(
            "DescribeVSwitchAttributes",
            json!({ "VSwitchId": "vsw-1", "Status": "Pending" }),
        );
        let service = VpcService::new(api.clone());

        let err = service
            .wait_for_vswitch("vsw-1", Status::Available, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("vsw-1"));
        assert!(matches!(
            err,
            AlicloudError::CloudError(aliform_cloud::CloudError::Timeout(_))
        ));
    }
}
