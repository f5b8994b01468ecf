//! aliform resource lifecycle contract
//!
//! This crate defines what a provider must implement to manage cloud
//! resources declaratively, and the host-side machinery around it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  aliform CLI                     │
//! │        (plan / apply / destroy / import)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                aliform-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait CloudProvider / Resource / Data   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐  │
//! │  │ Schema+Diff│ │ Retry/Wait │ │ State Mgmt │  │
//! │  └────────────┘ └────────────┘ └────────────┘  │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!          ┌────────▼────────┐
//!          │ alicloud        │
//!          │ provider        │
//!          └─────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod provider;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod state;

// Re-exports
pub use action::{Action, ActionType, ApplyResult, AttributeChange, Plan, PlanSummary, diff};
pub use error::{CloudError, Result};
pub use provider::{AuthStatus, CloudProvider, DataSource, Resource, RetryConfig};
pub use resource::ResourceData;
pub use retry::{RetryError, WaitStatus, retry, retry_with, wait_for};
pub use schema::{Attribute, AttributeType, Schema, Validator};
pub use state::{GlobalState, ResourceState, StateLock, StateManager};
