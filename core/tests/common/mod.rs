// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use authflow::{
  Action, ContinueNode, JsonObject, MockHttpClient, Module, Node, Request, RequestAdapter, Session, SharedContext,
  SuccessNode, Workflow, WorkflowConfig,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::json;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Level;

pub const FLOW_URL: &str = "https://auth.example.com/flows";

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Test hook failed in {stage}: {message}")]
  Hook { stage: String, message: String },

  #[error("Test transport failed: {0}")]
  Transport(String),
}

impl TestError {
  pub fn hook(stage: &str) -> Self {
    TestError::Hook {
      stage: stage.to_string(),
      message: format!("boom at {}", stage),
    }
  }
}

// --- Journal of hook invocations, shared by every recording module of a test ---
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&self, label: &str, stage: &str) {
    tracing::debug!(target: "test_hooks", label, stage, "hook ran");
    self.0.lock().push(format!("{}:{}", label, stage));
  }

  pub fn entries(&self) -> Vec<String> {
    self.0.lock().clone()
  }

  /// Entries for one stage, in the order the hooks ran.
  pub fn stage(&self, stage: &str) -> Vec<String> {
    let suffix = format!(":{}", stage);
    self.entries().into_iter().filter(|e| e.ends_with(&suffix)).collect()
  }

  pub fn count(&self, stage: &str) -> usize {
    self.stage(stage).len()
  }

  pub fn counts(&self) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for entry in self.entries() {
      if let Some((_, stage)) = entry.rsplit_once(':') {
        *counts.entry(stage.to_string()).or_insert(0) += 1;
      }
    }
    counts
  }
}

/// Configuration of a recording module registration.
#[derive(Debug, Clone, Default)]
pub struct RecordingConfig {
  pub label: String,
  /// Stage whose hook returns `TestError::hook(stage)`.
  pub fail_at: Option<&'static str>,
  /// Stage whose hook panics.
  pub panic_at: Option<&'static str>,
  /// Header added by the start and next hooks.
  pub header: Option<(String, String)>,
}

fn check(config: &RecordingConfig, stage: &'static str) -> anyhow::Result<()> {
  if config.panic_at == Some(stage) {
    panic!("{} panicked at {}", config.label, stage);
  }
  match config.fail_at {
    Some(failing) if failing == stage => Err(TestError::hook(stage).into()),
    _ => Ok(()),
  }
}

fn with_header(config: &RecordingConfig, request: Request) -> Request {
  match &config.header {
    Some((name, value)) => request.with_header(name.clone(), value.clone()),
    None => request,
  }
}

/// A module with a pass-through hook at every stage (its transform declines).
///
/// Each hook records `label:stage` in `journal`, then fails or panics if the
/// registration's config asks for it at that stage.
pub fn recording_module(name: &'static str, journal: &Journal) -> Module<RecordingConfig> {
  let journal = journal.clone();
  Module::<RecordingConfig>::with_factory(
    name,
    move || RecordingConfig {
      label: name.to_string(),
      ..Default::default()
    },
    move |setup| {
      let (config, journal_) = (setup.config(), journal.clone());
      setup.init(move |_ctx| {
        let config = config.snapshot();
        journal_.record(&config.label, "init");
        let result = check(&config, "init");
        async move { result }
      });

      let (config, journal_) = (setup.config(), journal.clone());
      setup.start(move |_ctx, request| {
        let config = config.snapshot();
        journal_.record(&config.label, "start");
        let result = check(&config, "start").map(|_| with_header(&config, request));
        async move { result }
      });

      let (config, journal_) = (setup.config(), journal.clone());
      setup.next(move |_ctx, _node, request| {
        let config = config.snapshot();
        journal_.record(&config.label, "next");
        let result = check(&config, "next").map(|_| with_header(&config, request));
        async move { result }
      });

      let (config, journal_) = (setup.config(), journal.clone());
      setup.response(move |_ctx, _response| {
        let config = config.snapshot();
        journal_.record(&config.label, "response");
        let result = check(&config, "response");
        async move { result }
      });

      let (config, journal_) = (setup.config(), journal.clone());
      setup.transform(move |_ctx, _response| {
        let config = config.snapshot();
        journal_.record(&config.label, "transform");
        let result = check(&config, "transform").map(|_| None);
        async move { result }
      });

      let (config, journal_) = (setup.config(), journal.clone());
      setup.node(move |_ctx, node| {
        let config = config.snapshot();
        journal_.record(&config.label, "node");
        let result = check(&config, "node").map(|_| node);
        async move { result }
      });

      let (config, journal_) = (setup.config(), journal.clone());
      setup.success(move |_ctx, success| {
        let config = config.snapshot();
        journal_.record(&config.label, "success");
        let result = check(&config, "success").map(|_| success);
        async move { result }
      });

      let (config, journal_) = (setup.config(), journal.clone());
      setup.sign_off(move |_ctx, request| {
        let config = config.snapshot();
        journal_.record(&config.label, "sign_off");
        let result = check(&config, "sign_off").map(|_| request);
        async move { result }
      });
    },
  )
}

/// Continue on the first response, Success on every later one. Ignores the body.
pub fn continue_then_succeed() -> Module<()> {
  Module::<()>::of("continue_then_succeed", |setup| {
    setup.transform(|ctx, _response| {
      let turn = ctx.update::<usize, _>("test.turns", |n| n.copied().unwrap_or(0) + 1);
      async move {
        let node = match turn? {
          1 => Node::Continue(
            ContinueNode::new(JsonObject::new()).with_request(Request::new().try_with_url(FLOW_URL)?.with_json(json!({}))),
          ),
          _ => Node::Success(SuccessNode::new(Session::new("session-token".to_string()))),
        };
        Ok::<_, anyhow::Error>(Some(node))
      }
    });
  })
}

/// A mock transport answering every request with `200 {}`.
pub fn ok_transport() -> Arc<MockHttpClient> {
  Arc::new(MockHttpClient::new().with_responder(|request| {
    Ok(authflow::Response::json_payload(request.clone(), 200, &json!({})))
  }))
}

/// Config preloaded with a transport and a start URL hook.
pub fn config_with(transport: Arc<MockHttpClient>) -> WorkflowConfig {
  let mut config = WorkflowConfig::new();
  config
    .http_client(transport)
    .module(&authflow::modules::ENDPOINT, |c| c.start_url = Some(FLOW_URL.to_string()));
  config
}

pub fn build(config: WorkflowConfig) -> Workflow {
  Workflow::new(config).expect("workflow builds with a mock transport")
}

// --- A text field action for ContinueNodes ---
pub struct TextField {
  pub key: String,
  pub value: Mutex<String>,
}

impl TextField {
  pub fn new(key: &str) -> Self {
    Self {
      key: key.to_string(),
      value: Mutex::new(String::new()),
    }
  }

  pub fn set(&self, value: &str) {
    *self.value.lock() = value.to_string();
  }
}

impl RequestAdapter for TextField {
  fn adapt(&self, _context: &SharedContext, request: Request) -> anyhow::Result<Request> {
    Ok(request.with_json_field(self.key.clone(), json!(self.value.lock().clone())))
  }
}

impl Action for TextField {
  fn as_any(&self) -> &dyn Any {
    self
  }

  fn request_adapter(&self) -> Option<&dyn RequestAdapter> {
    Some(self)
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
