// authflow/src/core/response.rs

//! Read-only view of the raw HTTP result handed to `response` and `transform` hooks.

use crate::core::request::Request;
use crate::error::{FlowError, FlowResult};
use bytes::Bytes;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

struct ResponseInner {
  request: Request,
  status: u16,
  headers: Vec<(String, String)>,
  body: Bytes,
  // Parsed on first access; parse failures are cached too.
  json: OnceCell<Result<Value, String>>,
}

/// The response to one `Request`.
///
/// Cheap to clone: every hook in a turn sees the same underlying value, so the
/// JSON body is parsed at most once no matter how many modules ask for it.
#[derive(Clone)]
pub struct Response {
  inner: Arc<ResponseInner>,
}

impl Response {
  pub fn new(request: Request, status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
    Self {
      inner: Arc::new(ResponseInner {
        request,
        status,
        headers,
        body: body.into(),
        json: OnceCell::new(),
      }),
    }
  }

  /// Convenience for transports and tests that produce JSON payloads.
  pub fn json_payload(request: Request, status: u16, body: &Value) -> Self {
    Self::new(
      request,
      status,
      vec![("Content-Type".to_string(), "application/json".to_string())],
      body.to_string(),
    )
  }

  /// The request this response answers.
  pub fn request(&self) -> &Request {
    &self.inner.request
  }

  pub fn status(&self) -> u16 {
    self.inner.status
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.inner.status)
  }

  pub fn is_client_error(&self) -> bool {
    (400..500).contains(&self.inner.status)
  }

  pub fn is_server_error(&self) -> bool {
    (500..600).contains(&self.inner.status)
  }

  pub fn headers(&self) -> &[(String, String)] {
    &self.inner.headers
  }

  /// First value of a header (case-insensitive).
  pub fn header(&self, name: &str) -> Option<&str> {
    self.header_values(name).next()
  }

  pub fn header_values<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a str> + 'b
  where
    'a: 'b,
  {
    self
      .inner
      .headers
      .iter()
      .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  /// Every `Set-Cookie` header value, in the order the server sent them.
  pub fn set_cookies(&self) -> impl Iterator<Item = &str> + '_ {
    self.header_values("Set-Cookie")
  }

  pub fn bytes(&self) -> &Bytes {
    &self.inner.body
  }

  pub fn text(&self) -> FlowResult<&str> {
    std::str::from_utf8(&self.inner.body).map_err(|e| FlowError::InvalidResponse(format!("body is not UTF-8: {}", e)))
  }

  /// The body parsed as JSON, parsed lazily on first call.
  pub fn json(&self) -> FlowResult<&Value> {
    let parsed = self
      .inner
      .json
      .get_or_init(|| serde_json::from_slice(&self.inner.body).map_err(|e| e.to_string()));
    parsed
      .as_ref()
      .map_err(|e| FlowError::InvalidResponse(format!("body is not JSON: {}", e)))
  }
}

impl fmt::Debug for Response {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Response")
      .field("status", &self.inner.status)
      .field("headers", &self.inner.headers)
      .field("body_len", &self.inner.body.len())
      .finish_non_exhaustive()
  }
}
