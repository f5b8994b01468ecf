//! Alibaba Cloud provider for aliform
//!
//! Resources:
//! - `alicloud_vpc`: VPC, including the lookup of its System route table
//! - `alicloud_vswitch`: VSwitch inside a VPC
//!
//! Data sources:
//! - `alicloud_db_instances`: RDS instances matching a set of filters
//!
//! All API access goes through the [`RpcApi`] trait, signed with
//! ACS3-HMAC-SHA256 by [`AliyunClient`].

pub mod client;
pub mod error;
pub mod provider;
pub mod rds;
pub mod signer;
pub mod vpc;

#[cfg(test)]
mod testing;

pub use client::{
    AliyunClient, ClientConfig, Credentials, OfflineApi, Params, Product, RpcApi, RpcRequest,
    build_client_token, call,
};
pub use error::{AlicloudError, Result};
pub use provider::AlicloudProvider;
pub use rds::DbInstancesDataSource;
pub use vpc::{VSwitchResource, VpcResource, VpcService};
