// authflow/src/workflow/execution.rs

//! Contains the turn logic: `Workflow::start`, `Workflow::next` and `Workflow::sign_off`.
//!
//! A turn runs the stages in fixed order, each over the installed hooks in
//! registration order:
//!
//! ```text
//! init (once) -> start | next -> send -> response -> transform -> node -> success
//! ```
//!
//! Every turn ends in a `Node`. A hook error stops the turn and becomes the
//! `FailureNode` cause unchanged; a hook panic becomes `FlowError::Panicked`.

use crate::core::node::{ContinueNode, FailureNode, Node, SuccessNode};
use crate::core::request::Request;
use crate::core::response::Response;
use crate::error::FlowError;
use crate::workflow::definition::Workflow;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{event, instrument, Level};

impl Workflow {
  /// Runs the first turn of a flow.
  ///
  /// Runs `init` first if it has not yet succeeded. Never fails: errors and
  /// panics come back as `Node::Failure`.
  pub async fn start(&self) -> Node {
    self.start_with(Request::new()).await
  }

  /// Like `start`, but the `start` hooks fold over `request` instead of an empty one.
  #[instrument(name = "Workflow::start", skip_all, fields(workflow = %self.inner.name))]
  pub async fn start_with(&self, request: Request) -> Node {
    self
      .turn(async move {
        self.ensure_init().await?;
        let request = self.run_start(request).await?;
        self.exchange(request).await
      })
      .await
  }

  /// Submits `node` and runs the following turn.
  #[instrument(name = "Workflow::next", skip_all, fields(workflow = %self.inner.name))]
  pub async fn next(&self, node: &ContinueNode) -> Node {
    let node = node.clone();
    self
      .turn(async move {
        self.ensure_init().await?;
        let request = node.as_request(&self.inner.context)?;
        let request = self.run_next(node, request).await?;
        self.exchange(request).await
      })
      .await
  }

  /// Best-effort sign-off.
  ///
  /// Every `sign_off` hook gets its chance: a failing hook is logged and
  /// skipped (the fold continues from the request before it). The resulting
  /// request is sent if it has a target. Returns the last failure observed,
  /// unchanged, or `Ok(())`.
  #[instrument(name = "Workflow::sign_off", skip_all, fields(workflow = %self.inner.name))]
  pub async fn sign_off(&self) -> anyhow::Result<()> {
    match AssertUnwindSafe(self.run_sign_off()).catch_unwind().await {
      Ok(result) => result,
      Err(payload) => {
        let message = panic_message(payload);
        event!(Level::ERROR, panic = %message, "Sign-off panicked.");
        Err(FlowError::Panicked(message).into())
      }
    }
  }

  // --- Turn plumbing ---

  /// The catch boundary of a turn.
  async fn turn<F>(&self, body: F) -> Node
  where
    F: Future<Output = anyhow::Result<Node>>,
  {
    match AssertUnwindSafe(body).catch_unwind().await {
      Ok(Ok(node)) => {
        event!(Level::DEBUG, node = node.kind(), "Turn finished.");
        node.attach(self)
      }
      Ok(Err(cause)) => {
        event!(Level::ERROR, error = %cause, "Turn failed.");
        Node::Failure(FailureNode::new(cause))
      }
      Err(payload) => {
        let message = panic_message(payload);
        event!(Level::ERROR, panic = %message, "Turn panicked.");
        Node::failure(FlowError::Panicked(message))
      }
    }
  }

  /// Runs the `init` hooks unless a previous run succeeded.
  ///
  /// A failed run is not remembered: the next call starts over from the first hook.
  async fn ensure_init(&self) -> anyhow::Result<()> {
    let mut initialized = self.inner.initialized.lock().await;
    if *initialized {
      return Ok(());
    }
    self.run_init().await?;
    *initialized = true;
    Ok(())
  }

  #[instrument(level = "debug", name = "stage", skip_all, fields(stage = "init"))]
  async fn run_init(&self) -> anyhow::Result<()> {
    for tagged in &self.inner.hooks.init {
      event!(Level::TRACE, module = %tagged.module, "init hook.");
      (tagged.hook)(self.inner.context.clone())
        .await
        .map_err(|e| hook_failed("init", &tagged.module, e))?;
    }
    Ok(())
  }

  #[instrument(level = "debug", name = "stage", skip_all, fields(stage = "start"))]
  async fn run_start(&self, mut request: Request) -> anyhow::Result<Request> {
    for tagged in &self.inner.hooks.start {
      event!(Level::TRACE, module = %tagged.module, "start hook.");
      request = (tagged.hook)(self.inner.context.clone(), request)
        .await
        .map_err(|e| hook_failed("start", &tagged.module, e))?;
    }
    Ok(request)
  }

  #[instrument(level = "debug", name = "stage", skip_all, fields(stage = "next"))]
  async fn run_next(&self, node: ContinueNode, mut request: Request) -> anyhow::Result<Request> {
    for tagged in &self.inner.hooks.next {
      event!(Level::TRACE, module = %tagged.module, "next hook.");
      request = (tagged.hook)(self.inner.context.clone(), node.clone(), request)
        .await
        .map_err(|e| hook_failed("next", &tagged.module, e))?;
    }
    Ok(request)
  }

  /// send -> response -> transform -> node -> success
  async fn exchange(&self, request: Request) -> anyhow::Result<Node> {
    let response = self.send(request).await?;
    self.run_response(&response).await?;
    let node = self.run_transform(&response).await?;
    let node = self.run_node(node).await?;
    match node {
      Node::Success(success) => self.run_success(success).await,
      other => Ok(other),
    }
  }

  async fn send(&self, request: Request) -> anyhow::Result<Response> {
    let timeout = self.inner.timeout;
    event!(
      Level::DEBUG,
      method = %request.method(),
      url = request.url().map(|u| u.as_str()).unwrap_or("<none>"),
      "Sending request."
    );
    let response = match tokio::time::timeout(timeout, self.inner.http_client.send(request)).await {
      Ok(Ok(response)) => response,
      Ok(Err(e)) => {
        event!(Level::ERROR, error = %e, "Transport failed.");
        return Err(e);
      }
      Err(_) => {
        event!(Level::ERROR, timeout_ms = timeout.as_millis() as u64, "Request timed out.");
        return Err(FlowError::Timeout(timeout).into());
      }
    };
    event!(Level::DEBUG, status = response.status(), "Response received.");
    Ok(response)
  }

  #[instrument(level = "debug", name = "stage", skip_all, fields(stage = "response"))]
  async fn run_response(&self, response: &Response) -> anyhow::Result<()> {
    for tagged in &self.inner.hooks.response {
      event!(Level::TRACE, module = %tagged.module, "response hook.");
      (tagged.hook)(self.inner.context.clone(), response.clone())
        .await
        .map_err(|e| hook_failed("response", &tagged.module, e))?;
    }
    Ok(())
  }

  /// First module (in order) to return a node wins.
  #[instrument(level = "debug", name = "stage", skip_all, fields(stage = "transform"))]
  async fn run_transform(&self, response: &Response) -> anyhow::Result<Node> {
    for tagged in &self.inner.hooks.transform {
      event!(Level::TRACE, module = %tagged.module, "transform hook.");
      let produced = (tagged.hook)(self.inner.context.clone(), response.clone())
        .await
        .map_err(|e| hook_failed("transform", &tagged.module, e))?;
      if let Some(node) = produced {
        event!(Level::DEBUG, module = %tagged.module, node = node.kind(), "Response transformed.");
        return Ok(node);
      }
    }
    event!(Level::ERROR, status = response.status(), "No module produced a node for the response.");
    Err(FlowError::UnhandledResponse {
      status: response.status(),
    }
    .into())
  }

  #[instrument(level = "debug", name = "stage", skip_all, fields(stage = "node"))]
  async fn run_node(&self, mut node: Node) -> anyhow::Result<Node> {
    for tagged in &self.inner.hooks.node {
      event!(Level::TRACE, module = %tagged.module, "node hook.");
      node = (tagged.hook)(self.inner.context.clone(), node)
        .await
        .map_err(|e| hook_failed("node", &tagged.module, e))?;
    }
    Ok(node)
  }

  #[instrument(level = "debug", name = "stage", skip_all, fields(stage = "success"))]
  async fn run_success(&self, mut success: SuccessNode) -> anyhow::Result<Node> {
    for tagged in &self.inner.hooks.success {
      event!(Level::TRACE, module = %tagged.module, "success hook.");
      success = (tagged.hook)(self.inner.context.clone(), success)
        .await
        .map_err(|e| hook_failed("success", &tagged.module, e))?;
    }
    Ok(Node::Success(success))
  }

  async fn run_sign_off(&self) -> anyhow::Result<()> {
    self.ensure_init().await?;

    let mut last_failure: Option<anyhow::Error> = None;
    let mut request = Request::new();
    for tagged in &self.inner.hooks.sign_off {
      event!(Level::TRACE, module = %tagged.module, "sign_off hook.");
      match (tagged.hook)(self.inner.context.clone(), request.clone()).await {
        Ok(next) => request = next,
        Err(e) => {
          event!(Level::WARN, module = %tagged.module, error = %e, "sign_off hook failed; continuing.");
          last_failure = Some(e);
        }
      }
    }

    if request.url().is_some() {
      if let Err(e) = self.send(request).await {
        event!(Level::WARN, error = %e, "Sign-off request failed.");
        last_failure = Some(e);
      }
    } else {
      event!(Level::DEBUG, "No sign-off target; skipping network call.");
    }

    match last_failure {
      Some(e) => Err(e),
      None => {
        event!(Level::INFO, "Signed off.");
        Ok(())
      }
    }
  }
}

fn hook_failed(stage: &'static str, module: &str, error: anyhow::Error) -> anyhow::Error {
  event!(Level::ERROR, stage, module = %module, error = %error, "Hook failed.");
  error
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
