// authflow/src/module/setup.rs

//! Hook signatures and the `Setup<C>` handle a module's setup closure uses to
//! install them.

use crate::core::config_data::ConfigData;
use crate::core::node::{ContinueNode, Node, SuccessNode};
use crate::core::request::Request;
use crate::core::response::Response;
use crate::core::shared_context::SharedContext;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The boxed future every hook returns.
///
/// Hooks run user code, so their error type is `anyhow::Error`. Whatever a hook
/// returns as `Err` becomes the turn's `FailureNode` cause unchanged.
pub type HookFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

pub type InitHook = Box<dyn Fn(SharedContext) -> HookFuture<()> + Send + Sync>;
pub type StartHook = Box<dyn Fn(SharedContext, Request) -> HookFuture<Request> + Send + Sync>;
pub type NextHook = Box<dyn Fn(SharedContext, ContinueNode, Request) -> HookFuture<Request> + Send + Sync>;
pub type ResponseHook = Box<dyn Fn(SharedContext, Response) -> HookFuture<()> + Send + Sync>;
pub type TransformHook = Box<dyn Fn(SharedContext, Response) -> HookFuture<Option<Node>> + Send + Sync>;
pub type NodeHook = Box<dyn Fn(SharedContext, Node) -> HookFuture<Node> + Send + Sync>;
pub type SuccessHook = Box<dyn Fn(SharedContext, SuccessNode) -> HookFuture<SuccessNode> + Send + Sync>;
pub type SignOffHook = Box<dyn Fn(SharedContext, Request) -> HookFuture<Request> + Send + Sync>;

/// A hook together with the name of the module that installed it (for logs).
pub(crate) struct Tagged<H> {
  pub(crate) module: Arc<str>,
  pub(crate) hook: H,
}

/// Every installed hook, per stage, already in execution order.
#[derive(Default)]
pub(crate) struct HookTable {
  pub(crate) init: Vec<Tagged<InitHook>>,
  pub(crate) start: Vec<Tagged<StartHook>>,
  pub(crate) next: Vec<Tagged<NextHook>>,
  pub(crate) response: Vec<Tagged<ResponseHook>>,
  pub(crate) transform: Vec<Tagged<TransformHook>>,
  pub(crate) node: Vec<Tagged<NodeHook>>,
  pub(crate) success: Vec<Tagged<SuccessHook>>,
  pub(crate) sign_off: Vec<Tagged<SignOffHook>>,
}

impl HookTable {
  pub(crate) fn len(&self) -> usize {
    self.init.len()
      + self.start.len()
      + self.next.len()
      + self.response.len()
      + self.transform.len()
      + self.node.len()
      + self.success.len()
      + self.sign_off.len()
  }
}

/// Handed to a module's setup closure, once per registration.
///
/// Gives access to the registration's configuration and to the workflow's
/// shared context, and installs hooks. A module installs only the stages it
/// needs; calling the same stage method twice installs two hooks that run in
/// installation order.
pub struct Setup<'a, C: Send + Sync + 'static> {
  module: Arc<str>,
  config: ConfigData<C>,
  context: SharedContext,
  hooks: &'a mut HookTable,
}

impl<'a, C: Send + Sync + 'static> Setup<'a, C> {
  pub(crate) fn new(module: Arc<str>, config: ConfigData<C>, context: SharedContext, hooks: &'a mut HookTable) -> Self {
    Self {
      module,
      config,
      context,
      hooks,
    }
  }

  /// This registration's configuration. Clone it into hook closures.
  pub fn config(&self) -> ConfigData<C> {
    self.config.clone()
  }

  /// The workflow's shared context (hooks also receive it as an argument).
  pub fn context(&self) -> SharedContext {
    self.context.clone()
  }

  pub fn module_name(&self) -> &str {
    &self.module
  }

  fn tag<H>(&self, hook: H) -> Tagged<H> {
    Tagged {
      module: Arc::clone(&self.module),
      hook,
    }
  }

  /// Runs once per workflow before its first turn; retried after a failure.
  pub fn init<F, Fut>(&mut self, hook: F)
  where
    F: Fn(SharedContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
  {
    let boxed: InitHook = Box::new(move |ctx| Box::pin(hook(ctx)) as HookFuture<()>);
    let tagged = self.tag(boxed);
    self.hooks.init.push(tagged);
  }

  /// Rewrites the first request of a flow.
  pub fn start<F, Fut>(&mut self, hook: F)
  where
    F: Fn(SharedContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Request>> + Send + 'static,
  {
    let boxed: StartHook = Box::new(move |ctx, request| Box::pin(hook(ctx, request)) as HookFuture<Request>);
    let tagged = self.tag(boxed);
    self.hooks.start.push(tagged);
  }

  /// Rewrites the request built from a submitted `ContinueNode`.
  pub fn next<F, Fut>(&mut self, hook: F)
  where
    F: Fn(SharedContext, ContinueNode, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Request>> + Send + 'static,
  {
    let boxed: NextHook = Box::new(move |ctx, node, request| Box::pin(hook(ctx, node, request)) as HookFuture<Request>);
    let tagged = self.tag(boxed);
    self.hooks.next.push(tagged);
  }

  /// Observes every raw response.
  pub fn response<F, Fut>(&mut self, hook: F)
  where
    F: Fn(SharedContext, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
  {
    let boxed: ResponseHook = Box::new(move |ctx, response| Box::pin(hook(ctx, response)) as HookFuture<()>);
    let tagged = self.tag(boxed);
    self.hooks.response.push(tagged);
  }

  /// Tries to turn a response into a node. `Ok(None)` declines.
  pub fn transform<F, Fut>(&mut self, hook: F)
  where
    F: Fn(SharedContext, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<Node>>> + Send + 'static,
  {
    let boxed: TransformHook = Box::new(move |ctx, response| Box::pin(hook(ctx, response)) as HookFuture<Option<Node>>);
    let tagged = self.tag(boxed);
    self.hooks.transform.push(tagged);
  }

  /// Rewrites the node produced by `transform`.
  pub fn node<F, Fut>(&mut self, hook: F)
  where
    F: Fn(SharedContext, Node) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Node>> + Send + 'static,
  {
    let boxed: NodeHook = Box::new(move |ctx, node| Box::pin(hook(ctx, node)) as HookFuture<Node>);
    let tagged = self.tag(boxed);
    self.hooks.node.push(tagged);
  }

  /// Post-processes a `SuccessNode` (finalize the session, persist tokens, ...).
  pub fn success<F, Fut>(&mut self, hook: F)
  where
    F: Fn(SharedContext, SuccessNode) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<SuccessNode>> + Send + 'static,
  {
    let boxed: SuccessHook = Box::new(move |ctx, node| Box::pin(hook(ctx, node)) as HookFuture<SuccessNode>);
    let tagged = self.tag(boxed);
    self.hooks.success.push(tagged);
  }

  /// Contributes to the sign-off request.
  pub fn sign_off<F, Fut>(&mut self, hook: F)
  where
    F: Fn(SharedContext, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Request>> + Send + 'static,
  {
    let boxed: SignOffHook = Box::new(move |ctx, request| Box::pin(hook(ctx, request)) as HookFuture<Request>);
    let tagged = self.tag(boxed);
    self.hooks.sign_off.push(tagged);
  }
}
