//! `alicloud_vswitch` resource

use super::api::{CreateVSwitch, DeleteVSwitch, ModifyVSwitchAttribute};
use super::service::{Status, VpcService};
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
const DELETE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const RETRY_DELAY: Duration = Duration::from_secs(5);

const CREATE_RETRYABLE: &[&str] = &[
    codes::TASK_CONFLICT,
    codes::UNKNOWN_ERROR,
    codes::THROTTLING,
    codes::OPERATION_CONFLICT,
    codes::SERVICE_UNAVAILABLE,
    codes::INCORRECT_VSWITCH_STATUS,
];

const DELETE_RETRYABLE: &[&str] = &[
    codes::DEPENDENCY_VIOLATION,
    codes::INCORRECT_VSWITCH_STATUS,
    codes::TASK_CONFLICT,
    codes::THROTTLING,
];

pub struct VSwitchResource {
    service: VpcService,
}

impl VSwitchResource {
    pub fn new(api: Arc<dyn RpcApi>) -> Self {
        Self {
            service: VpcService::new(api),
        }
    }
}

#[async_trait]
impl Resource for VSwitchResource {
    fn type_name(&self) -> &'static str {
        "alicloud_vswitch"
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Attribute::required("vpc_id", AttributeType::String).force_new(),
            Attribute::required("cidr_block", AttributeType::String)
                .force_new()
                .validate_with(Validator::CidrNetworkAddress),
            Attribute::required("availability_zone", AttributeType::String).force_new(),
            Attribute::optional("name", AttributeType::String)
                .validate_with(Validator::Custom(validate_name)),
            Attribute::optional("description", AttributeType::String)
                .validate_with(Validator::StringLength { min: 2, max: 256 }),
        ])
    }

    async fn create(&self, d: &mut ResourceData) -> aliform_cloud::Result<()> {
        let request = CreateVSwitch {
            vpc_id: d.get_str("vpc_id").to_string(),
            cidr_block: d.get_str("cidr_block").to_string(),
            zone_id: d.get_str("availability_zone").to_string(),
            v_switch_name: d.get_str("name").to_string(),
            description: d.get_str("description").to_string(),
            client_token: build_client_token("CreateVSwitch"),
        };
        let api = self.service.api();
        let req = &request;

        let config = RetryConfig::fixed(RETRY_DELAY);
        let response = retry_with(&config, CREATE_TIMEOUT, move || async move {
            call(api, req).await.map_err(|e| {
                if e.is_expected_error(CREATE_RETRYABLE) {
                    RetryError::Retryable(e)
                } else {
                    RetryError::NonRetryable(e)
                }
            })
        })
        .await
        .map_err(|e: AlicloudError| e.context(format!("creating vswitch in {}", request.vpc_id)))?;

        d.set_id(&response.v_switch_id);
        tracing::info!(id = %response.v_switch_id, vpc = %request.vpc_id, "VSwitch created");

        self.service
            .wait_for_vswitch(&response.v_switch_id, Status::Available, DEFAULT_TIMEOUT)
            .await?;

        self.read(d).await
    }

    async fn read(&self, d: &mut ResourceData) -> aliform_cloud::Result<()> {
        let id = d.id().to_string();
        let vswitch = match self.service.describe_vswitch(&id).await {
            Ok(vswitch) => vswitch,
            Err(e) if e.is_not_found() => {
                tracing::warn!(%id, "VSwitch no longer exists, removing it from state");
                d.set_id("");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        d.set("vpc_id", vswitch.vpc_id);
        d.set("cidr_block", vswitch.cidr_block);
        d.set("availability_zone", vswitch.zone_id);
        d.set("name", vswitch.v_switch_name);
        d.set("description", vswitch.description);
        Ok(())
    }

    async fn update(&self, d: &mut ResourceData) -> aliform_cloud::Result<()> {
        let mut request = ModifyVSwitchAttribute {
            v_switch_id: d.id().to_string(),
            ..Default::default()
        };
        if d.has_change("name") {
            request.v_switch_name = Some(d.get_str("name").to_string());
        }
        if d.has_change("description") {
            request.description = Some(d.get_str("description").to_string());
        }

        if !request.is_empty() {
            call(self.service.api(), &request)
                .await
                .map_err(|e| e.context(format!("modifying vswitch {}", request.v_switch_id)))?;
        }

        self.read(d).await
    }

    async fn delete(&self, d: &mut ResourceData) -> aliform_cloud::Result<()> {
        let request = DeleteVSwitch {
            v_switch_id: d.id().to_string(),
        };
        let api = self.service.api();
        let req = &request;

        retry(DELETE_TIMEOUT, move || async move {
            match call(api, req).await {
                Ok(_) => Ok(()),
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) if e.is_expected_error(DELETE_RETRYABLE) => Err(RetryError::Retryable(e)),
                Err(e) => Err(RetryError::NonRetryable(e)),
            }
        })
        .await
        .map_err(|e: AlicloudError| {
            e.context(format!("deleting vswitch {}", request.v_switch_id))
        })?;

        self.service
            .wait_for_vswitch(&request.v_switch_id, Status::Deleted, DEFAULT_TIMEOUT_MEDIUM)
            .await?;
        tracing::info!(id = %request.v_switch_id, "VSwitch deleted");
        Ok(())
    }
}
