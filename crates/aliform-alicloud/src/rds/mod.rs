//! RDS product: managed database instances

pub mod api;
mod data_source_db_instances;

pub use data_source_db_instances::{DbInstancesDataSource, InstanceSummary};
