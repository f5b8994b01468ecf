//! `alicloud_vpc` resource

use super::api::{CreateVpc, DeleteVpc, ModifyVpcAttribute};
use super::service::{Status, VpcService, find_system_route_table};
use super::validate_name;
use crate::client::{DEFAULT_TIMEOUT, DEFAULT_TIMEOUT_MEDIUM, RpcApi, build_client_token, call};
use crate::error::{AlicloudError, codes};
use aliform_cloud::{
    Attribute, AttributeType, Resource, ResourceData, RetryConfig, RetryError, Schema, Validator,
    retry, retry_with,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const CREATE_TIMEOUT: Duration = Duration::from_secs(3 * 60);
const CREATE_RETRY_DELAY: Duration = Duration::from_secs(5);
const DELETE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub struct VpcResource {
    service: VpcService,
}

impl VpcResource {
    pub fn new(api: Arc<dyn RpcApi>) -> Self {
        Self {
            service: VpcService::new(api),
        }
    }
}

#[async_trait]
impl Resource for VpcResource {
    fn type_name(&self) -> &'static str {
        "alicloud_vpc"
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Attribute::required("cidr_block", AttributeType::String)
                .force_new()
                .validate_with(Validator::CidrNetworkAddress),
            Attribute::optional("resource_group_id", AttributeType::String).with_computed(),
            Attribute::optional("name", AttributeType::String)
                .validate_with(Validator::Custom(validate_name)),
            Attribute::optional("description", AttributeType::String)
                .validate_with(Validator::StringLength { min: 2, max: 256 }),
            Attribute::computed("router_id", AttributeType::String),
            Attribute::computed("router_table_id", AttributeType::String)
                .deprecated("router_table_id has been deprecated, use route_table_id instead"),
            Attribute::computed("route_table_id", AttributeType::String),
        ])
    }

    async fn create(&self, d: &mut ResourceData) -> aliform_cloud::Result<()> {
        let request = CreateVpc {
            cidr_block: d.get_str("cidr_block").to_string(),
            vpc_name: d.get_str("name").to_string(),
            description: d.get_str("description").to_string(),
            resource_group_id: d.get_str("resource_group_id").to_string(),
            client_token: build_client_token("CreateVpc"),
        };
        let api = self.service.api();
        let req = &request;

        let response = retry_with(
            &RetryConfig::fixed(CREATE_RETRY_DELAY),
            CREATE_TIMEOUT,
            move || async move {
                call(api, req).await.map_err(|e| {
                    if e.is_expected_error(&[codes::VPC_QUOTA_EXCEEDED]) {
                        RetryError::NonRetryable(e.context(
                            "the VPC quota of this account is exhausted; \
                             delete unused VPCs or request a higher quota",
                        ))
                    } else if e.is_expected_error(&[
                        codes::TASK_CONFLICT,
                        codes::UNKNOWN_ERROR,
                        codes::THROTTLING,
                    ]) {
                        RetryError::Retryable(e)
                    } else {
                        RetryError::NonRetryable(e)
                    }
                })
            },
        )
        .await
        .map_err(|e: AlicloudError| e.context("creating vpc"))?;

        d.set_id(&response.vpc_id);
        tracing::info!(id = %response.vpc_id, "VPC created");

        self.service
            .wait_for_vpc(&response.vpc_id, Status::Available, DEFAULT_TIMEOUT)
            .await?;

        self.read(d).await
    }

    async fn read(&self, d: &mut ResourceData) -> aliform_cloud::Result<()> {
        let id = d.id().to_string();
        let vpc = match self.service.describe_vpc(&id).await {
            Ok(vpc) => vpc,
            Err(e) if e.is_not_found() => {
                tracing::warn!(%id, "VPC no longer exists, removing it from state");
                d.set_id("");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        d.set("cidr_block", vpc.cidr_block);
        d.set("name", vpc.vpc_name);
        d.set("description", vpc.description);
        d.set("router_id", vpc.v_router_id.clone());
        d.set("resource_group_id", vpc.resource_group_id.clone());

        let tables = self
            .service
            .describe_route_tables(&vpc.v_router_id, &vpc.resource_group_id)
            .await?;
        match find_system_route_table(&tables) {
            Some(table) => {
                d.set("router_table_id", table.route_table_id.clone());
                d.set("route_table_id", table.route_table_id.clone());
            }
            None => tracing::warn!(%id, "No System route table found"),
        }

        Ok(())
    }

    async fn update(&self, d: &mut ResourceData) -> aliform_cloud::Result<()> {
        let mut request = ModifyVpcAttribute {
            vpc_id: d.id().to_string(),
            ..Default::default()
        };
        if d.has_change("name") {
            request.vpc_name = Some(d.get_str("name").to_string());
        }
        if d.has_change("description") {
            request.description = Some(d.get_str("description").to_string());
        }

        if !request.is_empty() {
            call(self.service.api(), &request)
                .await
                .map_err(|e| e.context(format!("modifying vpc {}", request.vpc_id)))?;
            tracing::info!(id = %request.vpc_id, "VPC attributes modified");
        }

        self.read(d).await
    }

    async fn delete(&self, d: &mut ResourceData) -> aliform_cloud::Result<()> {
        let request = DeleteVpc {
            vpc_id: d.id().to_string(),
        };
        let api = self.service.api();
        let req = &request;

        retry(DELETE_TIMEOUT, move || async move {
            match call(api, req).await {
                Ok(_) => Ok(()),
                Err(e) if e.is_expected_error(&[
                    codes::INVALID_VPC_ID_NOT_FOUND,
                    codes::FORBIDDEN_VPC_NOT_FOUND,
                ]) =>
                {
                    Ok(())
                }
                // Dependent objects are often still being released
                Err(e) => Err(RetryError::Retryable(e)),
            }
        })
        .await
        .map_err(|e: AlicloudError| e.context(format!("deleting vpc {}", request.vpc_id)))?;

        self.service
            .wait_for_vpc(&request.vpc_id, Status::Deleted, DEFAULT_TIMEOUT_MEDIUM)
            .await?;
        tracing::info!(id = %request.vpc_id, "VPC deleted");
        Ok(())
    }
}
