//! RDS API requests and responses

use crate::client::{Params, Product, RpcRequest};
use serde::Deserialize;
use std::collections::BTreeMap;

/// `DescribeDBInstances` filters; empty filters are not sent
#[derive(Debug, Clone, Default)]
pub struct DescribeDBInstances {
    pub engine: String,
    pub status: String,
    pub db_type: String,
    pub vpc_id: String,
    pub vswitch_id: String,
    pub connection_mode: String,
    /// Tag filter as a JSON object string
    pub tags: String,
    pub page_number: usize,
    pub page_size: usize,
}

impl RpcRequest for DescribeDBInstances {
    const PRODUCT: Product = Product::Rds;
    const ACTION: &'static str = "DescribeDBInstances";
    type Response = DescribeDBInstancesResponse;

    fn params(&self) -> BTreeMap<String, String> {
        Params::new()
            .set_non_empty("Engine", &self.engine)
            .set_non_empty("DBInstanceStatus", &self.status)
            .set_non_empty("DBInstanceType", &self.db_type)
            .set_non_empty("VpcId", &self.vpc_id)
            .set_non_empty("VSwitchId", &self.vswitch_id)
            .set_non_empty("ConnectionMode", &self.connection_mode)
            .set_non_empty("Tags", &self.tags)
            .set("PageNumber", self.page_number)
            .set("PageSize", self.page_size)
            .build()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DescribeDBInstancesResponse {
    pub request_id: String,
    pub items: DBInstanceList,
    pub total_record_count: usize,
    pub page_number: usize,
    pub page_record_count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DBInstanceList {
    #[serde(rename = "DBInstance")]
    pub db_instance: Vec<DBInstance>,
}

/// One instance as listed by `DescribeDBInstances`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DBInstance {
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
    #[serde(rename = "DBInstanceDescription")]
    pub db_instance_description: String,
    pub region_id: String,
    #[serde(rename = "DBInstanceType")]
    pub db_instance_type: String,
    pub create_time: String,
    pub expire_time: String,
    #[serde(rename = "DBInstanceStatus")]
    pub db_instance_status: String,
    pub engine: String,
    pub engine_version: String,
    #[serde(rename = "DBInstanceNetType")]
    pub db_instance_net_type: String,
    #[serde(rename = "DBInstanceClass")]
    pub db_instance_class: String,
    pub connection_mode: String,
    pub zone_id: String,
    pub vpc_id: String,
    #[serde(rename = "VSwitchId")]
    pub vswitch_id: String,
    pub pay_type: String,
    pub master_instance_id: String,
    #[serde(rename = "GuardDBInstanceId")]
    pub guard_db_instance_id: String,
    #[serde(rename = "TempDBInstanceId")]
    pub temp_db_instance_id: String,
    #[serde(rename = "ReadOnlyDBInstanceIds")]
    pub read_only_db_instance_ids: ReadOnlyInstanceIds,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadOnlyInstanceIds {
    #[serde(rename = "ReadOnlyDBInstanceId")]
    pub read_only_db_instance_id: Vec<ReadOnlyInstanceId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadOnlyInstanceId {
    #[serde(rename = "DBInstanceId")]
    pub db_instance_id: String,
}
