//! VPC API requests and responses

use crate::client::{Params, Product, RpcRequest};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Response of actions that only acknowledge
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Ack {
    pub request_id: String,
}

// VPC

#[derive(Debug, Clone, Default)]
pub struct CreateVpc {
    pub cidr_block: String,
    pub vpc_name: String,
    pub description: String,
    pub resource_group_id: String,
    pub client_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CreateVpcResponse {
    pub request_id: String,
    pub vpc_id: String,
    pub v_router_id: String,
    pub route_table_id: String,
    pub resource_group_id: String,
}

impl RpcRequest for CreateVpc {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "CreateVpc";
    type Response = CreateVpcResponse;

    fn params(&self) -> BTreeMap<String, String> {
        Params::new()
            .set("CidrBlock", &self.cidr_block)
            .set_non_empty("VpcName", &self.vpc_name)
            .set_non_empty("Description", &self.description)
            .set_non_empty("ResourceGroupId", &self.resource_group_id)
            .set_non_empty("ClientToken", &self.client_token)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct DescribeVpcAttribute {
    pub vpc_id: String,
}

/// VPC as returned by `DescribeVpcAttribute`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VpcAttribute {
    pub vpc_id: String,
    pub region_id: String,
    pub status: String,
    pub vpc_name: String,
    pub creation_time: String,
    pub cidr_block: String,
    pub v_router_id: String,
    pub description: String,
    pub is_default: bool,
    pub resource_group_id: String,
}

impl RpcRequest for DescribeVpcAttribute {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "DescribeVpcAttribute";
    type Response = VpcAttribute;

    fn params(&self) -> BTreeMap<String, String> {
        Params::new().set("VpcId", &self.vpc_id).build()
    }
}

/// `ModifyVpcAttribute`; empty fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct ModifyVpcAttribute {
    pub vpc_id: String,
    pub vpc_name: Option<String>,
    pub description: Option<String>,
}

impl ModifyVpcAttribute {
    pub fn is_empty(&self) -> bool {
        self.vpc_name.is_none() && self.description.is_none()
    }
}

impl RpcRequest for ModifyVpcAttribute {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "ModifyVpcAttribute";
    type Response = Ack;

    fn params(&self) -> BTreeMap<String, String> {
        let mut params = Params::new().set("VpcId", &self.vpc_id);
        if let Some(name) = &self.vpc_name {
            params = params.set("VpcName", name);
        }
        if let Some(description) = &self.description {
            params = params.set("Description", description);
        }
        params.build()
    }
}

#[derive(Debug, Clone)]
pub struct DeleteVpc {
    pub vpc_id: String,
}

impl RpcRequest for DeleteVpc {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "DeleteVpc";
    type Response = Ack;

    fn params(&self) -> BTreeMap<String, String> {
        Params::new().set("VpcId", &self.vpc_id).build()
    }
}

// Route tables

#[derive(Debug, Clone, Default)]
pub struct DescribeRouteTables {
    pub v_router_id: String,
    pub resource_group_id: String,
    pub page_number: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RouteTable {
    pub route_table_id: String,
    pub route_table_type: String,
    pub v_router_id: String,
    pub creation_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RouteTableList {
    pub route_table: Vec<RouteTable>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DescribeRouteTablesResponse {
    pub request_id: String,
    pub route_tables: RouteTableList,
    pub total_count: usize,
    pub page_number: usize,
    pub page_size: usize,
}

impl RpcRequest for DescribeRouteTables {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "DescribeRouteTables";
    type Response = DescribeRouteTablesResponse;

    fn params(&self) -> BTreeMap<String, String> {
        Params::new()
            .set("VRouterId", &self.v_router_id)
            .set_non_empty("ResourceGroupId", &self.resource_group_id)
            .set("PageNumber", self.page_number)
            .set("PageSize", self.page_size)
            .build()
    }
}

// VSwitch

#[derive(Debug, Clone, Default)]
pub struct CreateVSwitch {
    pub vpc_id: String,
    pub cidr_block: String,
    pub zone_id: String,
    pub v_switch_name: String,
    pub description: String,
    pub client_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CreateVSwitchResponse {
    pub request_id: String,
    pub v_switch_id: String,
}

impl RpcRequest for CreateVSwitch {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "CreateVSwitch";
    type Response = CreateVSwitchResponse;

    fn params(&self) -> BTreeMap<String, String> {
        Params::new()
            .set("VpcId", &self.vpc_id)
            .set("CidrBlock", &self.cidr_block)
            .set("ZoneId", &self.zone_id)
            .set_non_empty("VSwitchName", &self.v_switch_name)
            .set_non_empty("Description", &self.description)
            .set_non_empty("ClientToken", &self.client_token)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct DescribeVSwitchAttributes {
    pub v_switch_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VSwitchAttributes {
    pub v_switch_id: String,
    pub vpc_id: String,
    pub status: String,
    pub cidr_block: String,
    pub zone_id: String,
    pub v_switch_name: String,
    pub description: String,
    pub creation_time: String,
    pub available_ip_address_count: i64,
    pub resource_group_id: String,
}

impl RpcRequest for DescribeVSwitchAttributes {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "DescribeVSwitchAttributes";
    type Response = VSwitchAttributes;

    fn params(&self) -> BTreeMap<String, String> {
        Params::new().set("VSwitchId", &self.v_switch_id).build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModifyVSwitchAttribute {
    pub v_switch_id: String,
    pub v_switch_name: Option<String>,
    pub description: Option<String>,
}

impl ModifyVSwitchAttribute {
    pub fn is_empty(&self) -> bool {
        self.v_switch_name.is_none() && self.description.is_none()
    }
}

impl RpcRequest for ModifyVSwitchAttribute {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "ModifyVSwitchAttribute";
    type Response = Ack;

    fn params(&self) -> BTreeMap<String, String> {
        let mut params = Params::new().set("VSwitchId", &self.v_switch_id);
        if let Some(name) = &self.v_switch_name {
            params = params.set("VSwitchName", name);
        }
        if let Some(description) = &self.description {
            params = params.set("Description", description);
        }
        params.build()
    }
}

#[derive(Debug, Clone)]
pub struct DeleteVSwitch {
    pub v_switch_id: String,
}

impl RpcRequest for DeleteVSwitch {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "DeleteVSwitch";
    type Response = Ack;

    fn params(&self) -> BTreeMap<String, String> {
        Params::new().set("VSwitchId", &self.v_switch_id).build()
    }
}

// Regions

#[derive(Debug, Clone, Default)]
pub struct DescribeRegions;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Region {
    pub region_id: String,
    pub local_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RegionList {
    pub region: Vec<Region>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DescribeRegionsResponse {
    pub request_id: String,
    pub regions: RegionList,
}

impl RpcRequest for DescribeRegions {
    const PRODUCT: Product = Product::Vpc;
    const ACTION: &'static str = "DescribeRegions";
    type Response = DescribeRegionsResponse;

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}
