// authflow/src/core/node.rs

//! The result of one workflow turn.
//!
//! ```text
//! Continue -> { Continue, Success, Error, Failure }   (via ContinueNode::next)
//! Error    -> { Continue, Success, Error, Failure }   (only through an attached retry node)
//! Success, Failure                                    (terminal)
//! ```

use crate::core::action::{Action, RequestAdapter};
use crate::core::request::Request;
use crate::core::shared_context::SharedContext;
use crate::error::FlowError;
use crate::workflow::Workflow;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub type JsonObject = Map<String, Value>;

/// What the caller gets back from `start()` and `next()`.
#[derive(Clone, Debug)]
pub enum Node {
  Continue(ContinueNode),
  Success(SuccessNode),
  Error(ErrorNode),
  Failure(FailureNode),
}

impl Node {
  /// Wraps any error as a `FailureNode`, keeping it unchanged.
  pub fn failure(cause: impl Into<anyhow::Error>) -> Self {
    Node::Failure(FailureNode::new(cause))
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Node::Continue(_) => "continue",
      Node::Success(_) => "success",
      Node::Error(_) => "error",
      Node::Failure(_) => "failure",
    }
  }

  /// Success and Failure are absorbing. Error is terminal unless a retry node is attached.
  pub fn is_terminal(&self) -> bool {
    match self {
      Node::Continue(_) => false,
      Node::Error(e) => e.retry.is_none(),
      Node::Success(_) | Node::Failure(_) => true,
    }
  }

  pub fn as_continue(&self) -> Option<&ContinueNode> {
    match self {
      Node::Continue(n) => Some(n),
      _ => None,
    }
  }

  pub fn as_success(&self) -> Option<&SuccessNode> {
    match self {
      Node::Success(n) => Some(n),
      _ => None,
    }
  }

  pub fn as_error(&self) -> Option<&ErrorNode> {
    match self {
      Node::Error(n) => Some(n),
      _ => None,
    }
  }

  pub fn as_failure(&self) -> Option<&FailureNode> {
    match self {
      Node::Failure(n) => Some(n),
      _ => None,
    }
  }

  /// Advances the flow from this node.
  ///
  /// On a terminal node this does not panic or error out; it returns a
  /// `FailureNode` whose cause is `FlowError::TerminalNode`.
  pub async fn next(&self) -> Node {
    match self {
      Node::Continue(node) => node.next().await,
      Node::Error(ErrorNode { retry: Some(node), .. }) => node.next().await,
      other => Node::failure(FlowError::TerminalNode { kind: other.kind() }),
    }
  }

  /// Binds every continuation reachable from this node to `workflow`.
  pub(crate) fn attach(mut self, workflow: &Workflow) -> Self {
    match &mut self {
      Node::Continue(node) => node.workflow = Some(workflow.clone()),
      Node::Error(ErrorNode { retry: Some(node), .. }) => node.workflow = Some(workflow.clone()),
      _ => {}
    }
    self
  }
}

/// More input is needed. Carries the server's step description and the
/// collaborator-defined actions the caller fills in before calling `next()`.
#[derive(Clone)]
pub struct ContinueNode {
  input: JsonObject,
  actions: Vec<Arc<dyn Action>>,
  request: Request,
  workflow: Option<Workflow>,
}

impl ContinueNode {
  pub fn new(input: JsonObject) -> Self {
    Self {
      input,
      actions: Vec::new(),
      request: Request::new(),
      workflow: None,
    }
  }

  pub fn with_action(mut self, action: impl Action) -> Self {
    self.actions.push(Arc::new(action));
    self
  }

  pub fn with_actions(mut self, actions: impl IntoIterator<Item = Arc<dyn Action>>) -> Self {
    self.actions.extend(actions);
    self
  }

  /// The template the next turn's request starts from (target URL, method, ...).
  pub fn with_request(mut self, request: Request) -> Self {
    self.request = request;
    self
  }

  pub fn input(&self) -> &JsonObject {
    &self.input
  }

  pub fn actions(&self) -> &[Arc<dyn Action>] {
    &self.actions
  }

  /// Actions of one concrete type, in list order.
  pub fn actions_of<T: Action>(&self) -> impl Iterator<Item = &T> + '_ {
    self.actions.iter().filter_map(|a| a.as_any().downcast_ref::<T>())
  }

  pub fn request_adapters(&self) -> impl Iterator<Item = &dyn RequestAdapter> + '_ {
    self.actions.iter().filter_map(|a| a.request_adapter())
  }

  pub fn template(&self) -> &Request {
    &self.request
  }

  /// Builds the submission for the next turn: the template request folded
  /// through every request-adapting action.
  pub fn as_request(&self, context: &SharedContext) -> anyhow::Result<Request> {
    self
      .request_adapters()
      .try_fold(self.request.clone(), |request, adapter| adapter.adapt(context, request))
  }

  pub fn is_attached(&self) -> bool {
    self.workflow.is_some()
  }

  /// Submits the collected input and runs one turn of the owning workflow.
  pub async fn next(&self) -> Node {
    match &self.workflow {
      Some(workflow) => workflow.next(self).await,
      None => Node::failure(FlowError::DetachedNode),
    }
  }
}

impl fmt::Debug for ContinueNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let action_names: Vec<&str> = self.actions.iter().map(|a| a.name()).collect();
    f.debug_struct("ContinueNode")
      .field("input", &self.input)
      .field("actions", &action_names)
      .field("request", &self.request)
      .field("attached", &self.workflow.is_some())
      .finish()
  }
}

/// Terminal: the flow authenticated. The session is opaque to the engine.
#[derive(Clone, Debug)]
pub struct SuccessNode {
  input: JsonObject,
  session: Session,
}

impl SuccessNode {
  pub fn new(session: Session) -> Self {
    Self {
      input: JsonObject::new(),
      session,
    }
  }

  pub fn with_input(mut self, input: JsonObject) -> Self {
    self.input = input;
    self
  }

  pub fn with_session(mut self, session: Session) -> Self {
    self.session = session;
    self
  }

  pub fn input(&self) -> &JsonObject {
    &self.input
  }

  pub fn session(&self) -> &Session {
    &self.session
  }
}

/// A recoverable, server-reported error (validation failure and the like).
#[derive(Clone, Debug)]
pub struct ErrorNode {
  input: JsonObject,
  message: String,
  retry: Option<Box<ContinueNode>>,
}

impl ErrorNode {
  pub fn new(input: JsonObject, message: impl Into<String>) -> Self {
    Self {
      input,
      message: message.into(),
      retry: None,
    }
  }

  /// Attaches the node the caller can resubmit from.
  pub fn with_retry(mut self, node: ContinueNode) -> Self {
    self.retry = Some(Box::new(node));
    self
  }

  pub fn input(&self) -> &JsonObject {
    &self.input
  }

  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn retry(&self) -> Option<&ContinueNode> {
    self.retry.as_deref()
  }
}

/// Terminal: something went wrong that the flow cannot recover from.
///
/// `cause` is the error exactly as the failing hook, transport or engine
/// produced it; downcast it to recover the concrete type.
#[derive(Clone, Debug)]
pub struct FailureNode {
  cause: Arc<anyhow::Error>,
}

impl FailureNode {
  pub fn new(cause: impl Into<anyhow::Error>) -> Self {
    Self {
      cause: Arc::new(cause.into()),
    }
  }

  pub fn cause(&self) -> &anyhow::Error {
    &self.cause
  }

  pub fn downcast_ref<E>(&self) -> Option<&E>
  where
    E: fmt::Display + fmt::Debug + Send + Sync + 'static,
  {
    self.cause.downcast_ref::<E>()
  }

  pub fn message(&self) -> String {
    self.cause.to_string()
  }
}

/// Whatever an authentication module attached to a `SuccessNode`
/// (token, SSO cookie, raw JSON ...).
#[derive(Clone, Default)]
pub struct Session {
  value: Option<Arc<dyn Any + Send + Sync>>,
  type_name: &'static str,
}

impl Session {
  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self {
      value: Some(Arc::new(value)),
      type_name: std::any::type_name::<T>(),
    }
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.value.is_none()
  }

  pub fn get<T: Any>(&self) -> Option<&T> {
    self.value.as_ref().and_then(|v| v.downcast_ref::<T>())
  }
}

impl fmt::Debug for Session {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.value {
      Some(_) => write!(f, "Session({})", self.type_name),
      None => write!(f, "Session(empty)"),
    }
  }
}
