// authflow/src/workflow/config.rs

//! `WorkflowConfig`: the ordered collection of module registrations plus the
//! workflow-wide settings (timeout, transport, name).

use crate::module::definition::{Module, ModuleId};
use crate::module::registration::{
  AnyModuleRegistration, ModuleOptions, ModuleRegistration, OverrideMode, RegistrationInfo, DEFAULT_PRIORITY,
};
use crate::transport::HttpClient;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{event, Level};

/// Default bound on a single network call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration a `Workflow` is built from.
///
/// Registering the same module more than once is resolved per `OverrideMode`:
///
/// - `Replace` (default): the config block runs against the existing
///   registration's config, so fields it leaves alone keep their earlier
///   values. The registration keeps its original position and priority, even if
///   the new call names another priority.
/// - `Append`: a second registration is added; both run.
/// - `Ignore`: no-op if the module is already registered.
///
/// Registrations run in ascending priority; equal priorities keep registration order.
pub struct WorkflowConfig {
  pub(crate) name: String,
  pub(crate) registrations: Vec<Box<dyn AnyModuleRegistration>>,
  pub(crate) timeout: Duration,
  pub(crate) http_client: Option<Arc<dyn HttpClient>>,
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    Self {
      name: "workflow".to_string(),
      registrations: Vec::new(),
      timeout: DEFAULT_TIMEOUT,
      http_client: None,
    }
  }
}

impl WorkflowConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `module` with default priority in `Replace` mode.
  pub fn module<C>(&mut self, module: &Module<C>, block: impl FnOnce(&mut C)) -> &mut Self
  where
    C: Send + Sync + 'static,
  {
    self.module_with(module, ModuleOptions::default(), block)
  }

  /// Registers `module` with explicit priority and override mode.
  pub fn module_with<C>(&mut self, module: &Module<C>, options: ModuleOptions, block: impl FnOnce(&mut C)) -> &mut Self
  where
    C: Send + Sync + 'static,
  {
    let id = module.id();
    match options.override_mode {
      OverrideMode::Replace => {
        if let Some(existing) = self.replace_target_mut::<C>(id) {
          block(existing);
          event!(Level::DEBUG, module = %module.name(), "Module already registered; config block applied to existing registration.");
          return self;
        }
      }
      OverrideMode::Ignore => {
        if self.registrations.iter().any(|r| r.module_id() == id) {
          event!(Level::DEBUG, module = %module.name(), "Module already registered; registration ignored.");
          return self;
        }
      }
      OverrideMode::Append => {}
    }

    let mut config = module.new_config();
    block(&mut config);
    let priority = options.priority.unwrap_or(DEFAULT_PRIORITY);
    event!(Level::DEBUG, module = %module.name(), priority, override_mode = ?options.override_mode, "Module registered.");
    self.registrations.push(Box::new(ModuleRegistration {
      module: module.clone(),
      config,
      priority,
      override_mode: options.override_mode,
    }));
    self
  }

  /// Bound on each network call (default 15 seconds).
  pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
    self.timeout = timeout;
    self
  }

  /// Transport used for every call. Defaults to a reqwest client honouring `timeout`.
  pub fn http_client(&mut self, client: Arc<dyn HttpClient>) -> &mut Self {
    self.http_client = Some(client);
    self
  }

  /// Label for this workflow's log spans.
  pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
    self.name = name.into();
    self
  }

  /// Registrations in execution order.
  pub fn registrations(&self) -> Vec<RegistrationInfo> {
    self.ordered_refs().into_iter().map(|r| r.info()).collect()
  }

  /// The config a later `Replace` registration of `module` would update.
  pub fn config_of<C>(&self, module: &Module<C>) -> Option<&C>
  where
    C: Send + Sync + 'static,
  {
    let id = module.id();
    self
      .registrations
      .iter()
      .filter(|r| r.module_id() == id && r.override_mode() != OverrideMode::Append)
      .find_map(|r| r.as_any().downcast_ref::<ModuleRegistration<C>>())
      .map(|r| &r.config)
  }

  /// Every config registered for `module`, in execution order.
  pub fn configs_of<C>(&self, module: &Module<C>) -> Vec<&C>
  where
    C: Send + Sync + 'static,
  {
    let id = module.id();
    self
      .ordered_refs()
      .into_iter()
      .filter(|r| r.module_id() == id)
      .filter_map(|r| r.as_any().downcast_ref::<ModuleRegistration<C>>())
      .map(|r| &r.config)
      .collect()
  }

  // Append registrations are never the target of a later Replace.
  fn replace_target_mut<C>(&mut self, id: ModuleId) -> Option<&mut C>
  where
    C: Send + Sync + 'static,
  {
    self
      .registrations
      .iter_mut()
      .filter(|r| r.module_id() == id && r.override_mode() != OverrideMode::Append)
      .find_map(|r| r.as_any_mut().downcast_mut::<ModuleRegistration<C>>())
      .map(|r| &mut r.config)
  }

  fn ordered_refs(&self) -> Vec<&dyn AnyModuleRegistration> {
    let mut refs: Vec<&dyn AnyModuleRegistration> = self.registrations.iter().map(|r| r.as_ref()).collect();
    // sort_by_key is stable: equal priorities keep registration order.
    refs.sort_by_key(|r| r.priority());
    refs
  }

  /// Consumes the registrations in execution order.
  pub(crate) fn take_ordered(&mut self) -> Vec<Box<dyn AnyModuleRegistration>> {
    let mut registrations = std::mem::take(&mut self.registrations);
    registrations.sort_by_key(|r| r.priority());
    registrations
  }
}

impl fmt::Debug for WorkflowConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkflowConfig")
      .field("name", &self.name)
      .field("registrations", &self.registrations())
      .field("timeout", &self.timeout)
      .field("custom_http_client", &self.http_client.is_some())
      .finish()
  }
}
