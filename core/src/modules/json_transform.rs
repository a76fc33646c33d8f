// authflow/src/modules/json_transform.rs

//! Turns JSON responses of a hypermedia-style flow API into nodes.
//!
//! | response                              | node                                   |
//! |---------------------------------------|----------------------------------------|
//! | >= 400, JSON body with `message_key`  | `ErrorNode` (input = body)             |
//! | >= 400, anything else                 | `FailureNode(FlowError::Api)`          |
//! | 2xx, JSON object with `success_key`   | `SuccessNode` (session = that value)   |
//! | 2xx, any other JSON object            | `ContinueNode` posting to `next_link`  |
//! | anything else                         | declined                               |
//!
//! The node hook remembers the last `ContinueNode` so that a following
//! `ErrorNode` can be retried from it. `start` forgets it: a new flow never
//! retries into a step of an abandoned one.

use crate::core::action::Action;
use crate::core::node::{ContinueNode, ErrorNode, JsonObject, Node, Session, SuccessNode};
use crate::core::request::Request;
use crate::core::response::Response;
use crate::core::shared_context::SharedContext;
use crate::error::FlowError;
use crate::module::Module;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};

pub const LAST_CONTINUE_KEY: &str = "authflow.json_transform.last_continue";

/// Builds the actions of a `ContinueNode` from the step's JSON object.
pub type ActionFactory = Arc<dyn Fn(&JsonObject) -> Vec<Arc<dyn Action>> + Send + Sync>;

#[derive(Clone)]
pub struct JsonTransformConfig {
  /// Top-level key whose presence marks a completed flow.
  pub success_key: String,
  /// Top-level key carrying the server's error message.
  pub message_key: String,
  /// JSON pointer to the URL the next step is posted to.
  pub next_link: String,
  pub actions: Option<ActionFactory>,
}

impl Default for JsonTransformConfig {
  fn default() -> Self {
    Self {
      success_key: "session".to_string(),
      message_key: "message".to_string(),
      next_link: "/_links/next/href".to_string(),
      actions: None,
    }
  }
}

impl fmt::Debug for JsonTransformConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("JsonTransformConfig")
      .field("success_key", &self.success_key)
      .field("message_key", &self.message_key)
      .field("next_link", &self.next_link)
      .field("actions", &self.actions.is_some())
      .finish()
  }
}

impl JsonTransformConfig {
  pub fn actions(&mut self, factory: impl Fn(&JsonObject) -> Vec<Arc<dyn Action>> + Send + Sync + 'static) -> &mut Self {
    self.actions = Some(Arc::new(factory));
    self
  }

  pub(crate) fn transform(&self, response: &Response) -> anyhow::Result<Option<Node>> {
    let status = response.status();
    let json = response.json().ok();
    let body = json.and_then(Value::as_object);

    if status >= 400 {
      let message = body.and_then(|b| b.get(&self.message_key)).and_then(Value::as_str);
      return Ok(Some(match (body, message) {
        (Some(body), Some(message)) => Node::Error(ErrorNode::new(body.clone(), message)),
        _ => Node::failure(FlowError::Api {
          status,
          body: String::from_utf8_lossy(response.bytes()).into_owned(),
        }),
      }));
    }

    let Some(body) = body.filter(|_| response.is_success()) else {
      return Ok(None);
    };

    if let Some(session) = body.get(&self.success_key) {
      return Ok(Some(Node::Success(
        SuccessNode::new(Session::new(session.clone())).with_input(body.clone()),
      )));
    }

    let mut node = ContinueNode::new(body.clone());
    if let Some(link) = json.and_then(|v| v.pointer(&self.next_link)).and_then(Value::as_str) {
      let url = match response.request().url() {
        Some(base) => base.join(link),
        None => url::Url::parse(link),
      }
      .map_err(|e| FlowError::InvalidResponse(format!("invalid next link '{}': {}", link, e)))?;
      node = node.with_request(Request::new().with_url(url).with_json(json!({})));
    }
    if let Some(factory) = &self.actions {
      node = node.with_actions(factory(body));
    }
    Ok(Some(Node::Continue(node)))
  }
}

/// Remembers continuations and hands the last one to an `ErrorNode` as its retry.
fn link_retry(context: &SharedContext, node: Node) -> anyhow::Result<Node> {
  match node {
    Node::Continue(next) => {
      context.set(LAST_CONTINUE_KEY, next.clone());
      Ok(Node::Continue(next))
    }
    Node::Error(error) if error.retry().is_none() => match context.get::<ContinueNode>(LAST_CONTINUE_KEY)? {
      Some(previous) => {
        event!(Level::DEBUG, "Error node can be retried from the previous step.");
        Ok(Node::Error(error.with_retry(previous)))
      }
      None => Ok(Node::Error(error)),
    },
    other => Ok(other),
  }
}

pub static JSON_TRANSFORM: Lazy<Module<JsonTransformConfig>> = Lazy::new(|| {
  Module::<JsonTransformConfig>::of("json_transform", |setup| {
    setup.start(|ctx, request| {
      ctx.remove(LAST_CONTINUE_KEY);
      async move { Ok(request) }
    });

    let config = setup.config();
    setup.transform(move |_ctx, response| {
      let result = config.read().transform(&response);
      async move { result }
    });

    setup.node(|ctx, node| {
      let result = link_retry(&ctx, node);
      async move { result }
    });

    setup.success(|ctx, success| {
      ctx.remove(LAST_CONTINUE_KEY);
      async move { Ok(success) }
    });
  })
});
