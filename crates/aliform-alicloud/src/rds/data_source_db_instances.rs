//! `alicloud_db_instances` data source

use super::api::{DBInstance, DescribeDBInstances};
use crate::client::{PAGE_SIZE_XLARGE, RpcApi, call};
use crate::error::{AlicloudError, Result};
use crate::signer::hex_sha256;
use aliform_cloud::{Attribute, AttributeType, DataSource, ResourceData, Schema, Validator};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

const ENGINES: &[&str] = &["MySQL", "SQLServer", "PostgreSQL", "PPAS", "MariaDB"];
const DB_TYPES: &[&str] = &["Primary", "Readonly", "Guard", "Temp"];
const CONNECTION_MODES: &[&str] = &["Standard", "Safe"];

/// Flattened view of an instance, as exposed in `instances`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSummary {
    pub id: String,
    pub name: String,
    pub db_type: String,
    pub region_id: String,
    pub create_time: String,
    pub expire_time: String,
    pub status: String,
    pub engine: String,
    pub engine_version: String,
    pub net_type: String,
    pub instance_type: String,
    pub connection_mode: String,
    pub availability_zone: String,
    pub vpc_id: String,
    pub vswitch_id: String,
    pub charge_type: String,
    pub master_instance_id: String,
    pub guard_instance_id: String,
    pub temp_instance_id: String,
    pub readonly_instance_ids: Vec<String>,
}

impl From<DBInstance> for InstanceSummary {
    fn from(db: DBInstance) -> Self {
        Self {
            id: db.db_instance_id,
            name: db.db_instance_description,
            db_type: db.db_instance_type,
            region_id: db.region_id,
            create_time: db.create_time,
            expire_time: db.expire_time,
            status: db.db_instance_status,
            engine: db.engine,
            engine_version: db.engine_version,
            net_type: db.db_instance_net_type,
            instance_type: db.db_instance_class,
            connection_mode: db.connection_mode,
            availability_zone: db.zone_id,
            vpc_id: db.vpc_id,
            vswitch_id: db.vswitch_id,
            charge_type: db.pay_type,
            master_instance_id: db.master_instance_id,
            guard_instance_id: db.guard_db_instance_id,
            temp_instance_id: db.temp_db_instance_id,
            readonly_instance_ids: db
                .read_only_db_instance_ids
                .read_only_db_instance_id
                .into_iter()
                .map(|r| r.db_instance_id)
                .collect(),
        }
    }
}

/// Identifier of a result set; independent of listing order
fn result_id(ids: &[String]) -> String {
    let mut sorted = ids.to_vec();
    sorted.sort();
    hex_sha256(sorted.join(",").as_bytes())[..16].to_string()
}

pub struct DbInstancesDataSource {
    api: Arc<dyn RpcApi>,
}

impl DbInstancesDataSource {
    pub fn new(api: Arc<dyn RpcApi>) -> Self {
        Self { api }
    }

    /// Every instance matching the server-side filters
    #[tracing::instrument(skip(self, filter))]
    async fn list(&self, filter: DescribeDBInstances) -> Result<Vec<DBInstance>> {
        let mut request = DescribeDBInstances {
            page_number: 1,
            page_size: PAGE_SIZE_XLARGE,
            ..filter
        };
        let mut instances = Vec::new();

        loop {
            let page = call(&*self.api, &request)
                .await
                .map_err(|e| e.context("listing db instances"))?;

            let count = page.items.db_instance.len();
            instances.extend(page.items.db_instance);
            if count < PAGE_SIZE_XLARGE {
                break;
            }
            request.page_number += 1;
        }

        tracing::debug!(count = instances.len(), "Listed db instances");
        Ok(instances)
    }
}

async fn write_output_file(path: &Path, instances: &[InstanceSummary]) -> Result<()> {
    let content = serde_json::to_string_pretty(instances)?;
    tokio::fs::write(path, content).await?;
    tracing::info!("Wrote {} instances to {}", instances.len(), path.display());
    Ok(())
}

#[async_trait]
impl DataSource for DbInstancesDataSource {
    fn type_name(&self) -> &'static str {
        "alicloud_db_instances"
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Attribute::optional("name_regex", AttributeType::String)
                .validate_with(Validator::Regex),
            Attribute::optional("engine", AttributeType::String)
                .validate_with(Validator::OneOf(ENGINES)),
            Attribute::optional("status", AttributeType::String),
            Attribute::optional("db_type", AttributeType::String)
                .validate_with(Validator::OneOf(DB_TYPES)),
            Attribute::optional("vpc_id", AttributeType::String),
            Attribute::optional("vswitch_id", AttributeType::String),
            Attribute::optional("connection_mode", AttributeType::String)
                .validate_with(Validator::OneOf(CONNECTION_MODES)),
            Attribute::optional("tags", AttributeType::Map),
            Attribute::optional("output_file", AttributeType::String),
            Attribute::computed("ids", AttributeType::List),
            Attribute::computed("names", AttributeType::List),
            Attribute::computed("instances", AttributeType::ObjectList),
        ])
    }

    async fn read(&self, d: &mut ResourceData) -> aliform_cloud::Result<()> {
        let name_regex = match d.get_str("name_regex") {
            "" => None,
            pattern => Some(regex::Regex::new(pattern).map_err(|e| {
                AlicloudError::InvalidConfig(format!("name_regex {:?}: {}", pattern, e))
            })?),
        };

        let tags = d.get_map("tags");
        let filter = DescribeDBInstances {
            engine: d.get_str("engine").to_string(),
            status: d.get_str("status").to_string(),
            db_type: d.get_str("db_type").to_string(),
            vpc_id: d.get_str("vpc_id").to_string(),
            vswitch_id: d.get_str("vswitch_id").to_string(),
            connection_mode: d.get_str("connection_mode").to_string(),
            tags: if tags.is_empty() {
                String::new()
            } else {
                serde_json::to_string(&tags).map_err(AlicloudError::from)?
            },
            ..Default::default()
        };

        let instances: Vec<InstanceSummary> = self
            .list(filter)
            .await?
            .into_iter()
            .filter(|db| {
                name_regex
                    .as_ref()
                    .is_none_or(|re| re.is_match(&db.db_instance_description))
            })
            .map(InstanceSummary::from)
            .collect();

        let ids: Vec<String> = instances.iter().map(|i| i.id.clone()).collect();
        let names: Vec<String> = instances.iter().map(|i| i.name.clone()).collect();

        d.set_id(result_id(&ids));
        d.set("ids", ids);
        d.set("names", names);
        d.set(
            "instances",
            serde_json::to_value(&instances).map_err(AlicloudError::from)?,
        );

        let output_file = d.get_str("output_file").to_string();
        if !output_file.is_empty() {
            write_output_file(Path::new(&output_file), &instances).await?;
        }
        Ok(())
    }
}
