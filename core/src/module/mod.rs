// authflow/src/module/mod.rs

//! Pluggable units of behaviour: a `Module` is a stateless template that, once
//! registered, installs hooks for the pipeline stages it cares about.

pub mod definition;
pub mod registration;
pub mod setup;

pub use definition::{Module, ModuleId};
pub use registration::{ModuleOptions, OverrideMode, RegistrationInfo, DEFAULT_PRIORITY};
pub use setup::{HookFuture, Setup};
