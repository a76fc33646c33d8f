// authflow/src/workflow/definition.rs

//! Contains the `Workflow` struct and its construction from a `WorkflowConfig`.

use crate::core::shared_context::SharedContext;
use crate::error::FlowResult;
use crate::module::registration::RegistrationInfo;
use crate::module::setup::HookTable;
use crate::transport::{HttpClient, ReqwestHttpClient};
use crate::workflow::config::WorkflowConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{event, instrument, Level};

pub(crate) struct WorkflowInner {
  pub(crate) name: String,
  pub(crate) context: SharedContext,
  pub(crate) hooks: HookTable,
  pub(crate) modules: Vec<RegistrationInfo>,
  pub(crate) timeout: Duration,
  pub(crate) http_client: Arc<dyn HttpClient>,
  // true once every init hook succeeded. Held across the init hooks so that
  // concurrent turns on one instance never initialize twice.
  pub(crate) initialized: AsyncMutex<bool>,
}

/// One running instance of a configured flow.
///
/// Owns the installed hooks, the `SharedContext` and the transport. Cloning is
/// cheap and yields a handle to the same instance; independent instances share
/// nothing.
#[derive(Clone)]
pub struct Workflow {
  pub(crate) inner: Arc<WorkflowInner>,
}

impl Workflow {
  /// Builds a workflow, running every registration's setup closure in execution order.
  ///
  /// Fails only if no transport was configured and the default one cannot be created.
  #[instrument(name = "Workflow::new", skip_all, fields(workflow = %config.name))]
  pub fn new(mut config: WorkflowConfig) -> FlowResult<Self> {
    let http_client: Arc<dyn HttpClient> = match config.http_client.take() {
      Some(client) => client,
      None => Arc::new(ReqwestHttpClient::new(config.timeout)?),
    };

    let context = SharedContext::new();
    let mut hooks = HookTable::default();
    let registrations = config.take_ordered();
    let modules: Vec<RegistrationInfo> = registrations.iter().map(|r| r.info()).collect();
    for registration in registrations {
      registration.install(&context, &mut hooks);
    }

    event!(
      Level::DEBUG,
      modules = modules.len(),
      hooks = hooks.len(),
      timeout_ms = config.timeout.as_millis() as u64,
      "Workflow built."
    );

    Ok(Self {
      inner: Arc::new(WorkflowInner {
        name: config.name,
        context,
        hooks,
        modules,
        timeout: config.timeout,
        http_client,
        initialized: AsyncMutex::new(false),
      }),
    })
  }

  /// Shorthand for building a config in a closure and then the workflow.
  pub fn configure(block: impl FnOnce(&mut WorkflowConfig)) -> FlowResult<Self> {
    let mut config = WorkflowConfig::new();
    block(&mut config);
    Self::new(config)
  }

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  /// The namespace shared by every hook of this instance.
  pub fn context(&self) -> &SharedContext {
    &self.inner.context
  }

  /// Installed registrations in execution order.
  pub fn modules(&self) -> &[RegistrationInfo] {
    &self.inner.modules
  }

  pub fn timeout(&self) -> Duration {
    self.inner.timeout
  }

  /// Whether `init` has completed successfully.
  pub async fn is_initialized(&self) -> bool {
    *self.inner.initialized.lock().await
  }
}

impl fmt::Debug for Workflow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Workflow")
      .field("name", &self.inner.name)
      .field("modules", &self.inner.modules)
      .field("timeout", &self.inner.timeout)
      .finish_non_exhaustive()
  }
}
