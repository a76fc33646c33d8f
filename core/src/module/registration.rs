// authflow/src/module/registration.rs

//! One module registered on a workflow, with its own config, priority and override mode.

use crate::core::config_data::ConfigData;
use crate::core::shared_context::SharedContext;
use crate::module::definition::{Module, ModuleId};
use crate::module::setup::{HookTable, Setup};
use std::any::Any;
use std::sync::Arc;
use tracing::{event, Level};

/// Priority used when a registration does not name one.
///
/// Registrations sharing a priority keep their registration order, so leaving
/// priorities alone gives plain first-registered, first-run ordering.
pub const DEFAULT_PRIORITY: i32 = 10;

/// What registering an already-registered module does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrideMode {
  /// Apply the new config block to the existing registration. Keeps its position.
  #[default]
  Replace,
  /// Add a second, independent registration. Both run.
  Append,
  /// Keep the existing registration untouched.
  Ignore,
}

/// Priority and override mode for `WorkflowConfig::module_with`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleOptions {
  pub(crate) priority: Option<i32>,
  pub(crate) override_mode: OverrideMode,
}

impl ModuleOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Lower values run earlier.
  pub fn priority(mut self, priority: i32) -> Self {
    self.priority = Some(priority);
    self
  }

  pub fn override_mode(mut self, mode: OverrideMode) -> Self {
    self.override_mode = mode;
    self
  }

  pub fn append(self) -> Self {
    self.override_mode(OverrideMode::Append)
  }

  pub fn ignore(self) -> Self {
    self.override_mode(OverrideMode::Ignore)
  }
}

/// Read-only description of a registration, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInfo {
  pub module: String,
  pub module_id: ModuleId,
  pub priority: i32,
  pub override_mode: OverrideMode,
}

pub(crate) struct ModuleRegistration<C: Send + Sync + 'static> {
  pub(crate) module: Module<C>,
  pub(crate) config: C,
  pub(crate) priority: i32,
  pub(crate) override_mode: OverrideMode,
}

/// Type-erased registration so modules with different config types can share
/// one ordered list.
pub(crate) trait AnyModuleRegistration: Send + Sync {
  fn module_id(&self) -> ModuleId;
  fn module_name(&self) -> &str;
  fn priority(&self) -> i32;
  fn override_mode(&self) -> OverrideMode;
  fn as_any(&self) -> &dyn Any;
  fn as_any_mut(&mut self) -> &mut dyn Any;

  fn info(&self) -> RegistrationInfo {
    RegistrationInfo {
      module: self.module_name().to_string(),
      module_id: self.module_id(),
      priority: self.priority(),
      override_mode: self.override_mode(),
    }
  }

  /// Moves the config into a `ConfigData` and runs the module's setup closure,
  /// which installs this registration's hooks into `hooks`.
  fn install(self: Box<Self>, context: &SharedContext, hooks: &mut HookTable);
}

impl<C: Send + Sync + 'static> AnyModuleRegistration for ModuleRegistration<C> {
  fn module_id(&self) -> ModuleId {
    self.module.id()
  }

  fn module_name(&self) -> &str {
    self.module.name()
  }

  fn priority(&self) -> i32 {
    self.priority
  }

  fn override_mode(&self) -> OverrideMode {
    self.override_mode
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }

  fn install(self: Box<Self>, context: &SharedContext, hooks: &mut HookTable) {
    let ModuleRegistration { module, config, priority, .. } = *self;
    let before = hooks.len();
    let name: Arc<str> = Arc::from(module.name());
    let mut setup = Setup::new(name, ConfigData::new(config), context.clone(), hooks);
    module.install(&mut setup);
    event!(
      Level::DEBUG,
      module = %module.name(),
      priority,
      hooks_installed = hooks.len() - before,
      "Module installed."
    );
  }
}
