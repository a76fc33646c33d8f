// authflow/src/transport/mock.rs

//! In-process transport for tests and demos.

use crate::core::request::Request;
use crate::core::response::Response;
use crate::transport::HttpClient;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;

type Responder = Box<dyn Fn(&Request) -> anyhow::Result<Response> + Send + Sync>;

enum Reply {
  Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
  },
  Error(anyhow::Error),
}

/// Answers requests from a queue of canned replies, falling back to an
/// optional responder closure, and records every request it receives.
#[derive(Default)]
pub struct MockHttpClient {
  queue: Mutex<VecDeque<Reply>>,
  responder: Option<Responder>,
  requests: Mutex<Vec<Request>>,
  delay: Option<Duration>,
}

impl MockHttpClient {
  pub fn new() -> Self {
    Self::default()
  }

  /// Answers every request the queue does not cover.
  pub fn with_responder(mut self, responder: impl Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static) -> Self {
    self.responder = Some(Box::new(responder));
    self
  }

  /// Waits this long before answering (for timeout and cancellation tests).
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn enqueue(&self, status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> &Self {
    self.queue.lock().push_back(Reply::Response {
      status,
      headers,
      body: body.into(),
    });
    self
  }

  pub fn enqueue_json(&self, status: u16, body: Value) -> &Self {
    self.enqueue(
      status,
      vec![("Content-Type".to_string(), "application/json".to_string())],
      body.to_string(),
    )
  }

  /// The next request fails at the transport level with `error`.
  pub fn enqueue_error(&self, error: impl Into<anyhow::Error>) -> &Self {
    self.queue.lock().push_back(Reply::Error(error.into()));
    self
  }

  /// Every request received so far, oldest first.
  pub fn requests(&self) -> Vec<Request> {
    self.requests.lock().clone()
  }

  pub fn request_count(&self) -> usize {
    self.requests.lock().len()
  }
}

#[async_trait]
impl HttpClient for MockHttpClient {
  async fn send(&self, request: Request) -> anyhow::Result<Response> {
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    self.requests.lock().push(request.clone());
    let reply = self.queue.lock().pop_front();
    match reply {
      Some(Reply::Response { status, headers, body }) => Ok(Response::new(request, status, headers, body)),
      Some(Reply::Error(error)) => Err(error),
      None => match &self.responder {
        Some(responder) => responder(&request),
        None => Err(anyhow::anyhow!(
          "MockHttpClient: no reply queued for {} {}",
          request.method(),
          request.url().map(|u| u.as_str()).unwrap_or("<no url>")
        )),
      },
    }
  }
}
