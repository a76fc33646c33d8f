// authflow/src/workflow/mod.rs

//! Defines the `Workflow` executor, its configuration and its turn logic.

pub mod config;
pub mod definition;
pub mod execution;

pub use config::{WorkflowConfig, DEFAULT_TIMEOUT};
pub use definition::Workflow;
