// authflow/src/module/definition.rs

//! Defines `Module<C>`, the template every registration is created from.

use crate::module::setup::Setup;
use std::fmt;
use std::sync::Arc;

/// Identity of a module template.
///
/// Two `Module` values are the same module only if they are clones of one
/// another; equal names do not make modules equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(usize);

struct ModuleInner<C: Send + Sync + 'static> {
  name: String,
  config: Box<dyn Fn() -> C + Send + Sync>,
  setup: Box<dyn Fn(&mut Setup<'_, C>) + Send + Sync>,
}

/// A named bundle of optional stage hooks plus a factory for its configuration.
///
/// `C` is the module's configuration type. Every registration gets its own
/// `C`, produced by the factory and then shaped by the registering config block.
/// The `setup` closure runs once per registration when the workflow is built;
/// it reads the registration's config through `Setup::config` and installs hooks.
///
/// Modules are usually declared once, as `Lazy` statics, so that every
/// registration refers to the same identity:
///
/// ```rust,ignore
/// static GREETER: Lazy<Module<GreeterConfig>> = Lazy::new(|| {
///   Module::of("greeter", |setup| {
///     let config = setup.config();
///     setup.start(move |_ctx, request| {
///       let greeting = config.read().greeting.clone();
///       async move { Ok(request.with_header("X-Greeting", greeting)) }
///     });
///   })
/// });
/// ```
pub struct Module<C: Send + Sync + 'static> {
  inner: Arc<ModuleInner<C>>,
}

impl<C: Send + Sync + 'static> Module<C> {
  /// Creates a module whose configuration starts from `C::default()`.
  pub fn of(name: impl Into<String>, setup: impl Fn(&mut Setup<'_, C>) + Send + Sync + 'static) -> Self
  where
    C: Default,
  {
    Self::with_factory(name, C::default, setup)
  }

  /// Creates a module with an explicit configuration factory.
  pub fn with_factory(
    name: impl Into<String>,
    config: impl Fn() -> C + Send + Sync + 'static,
    setup: impl Fn(&mut Setup<'_, C>) + Send + Sync + 'static,
  ) -> Self {
    Self {
      inner: Arc::new(ModuleInner {
        name: name.into(),
        config: Box::new(config),
        setup: Box::new(setup),
      }),
    }
  }

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  pub fn id(&self) -> ModuleId {
    ModuleId(Arc::as_ptr(&self.inner) as *const () as usize)
  }

  pub(crate) fn new_config(&self) -> C {
    (self.inner.config)()
  }

  pub(crate) fn install(&self, setup: &mut Setup<'_, C>) {
    (self.inner.setup)(setup)
  }
}

impl<C: Send + Sync + 'static> Clone for Module<C> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<C: Send + Sync + 'static> fmt::Debug for Module<C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Module")
      .field("name", &self.inner.name)
      .field("id", &self.id())
      .field("config_type", &std::any::type_name::<C>())
      .finish()
  }
}
