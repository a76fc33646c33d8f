// authflow/src/core/request.rs

//! The outgoing request every turn builds by folding module hooks over it.

use crate::error::{FlowError, FlowResult};
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;

/// Body of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
  #[default]
  Empty,
  Json(Value),
  Form(Vec<(String, String)>),
}

/// A builder-style, mutable description of one HTTP call.
///
/// Built fresh for every turn and consumed by the transport. Headers are
/// multi-valued and keep insertion order (repeated `Cookie` headers are legal).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
  method: Method,
  url: Option<Url>,
  parameters: Vec<(String, String)>,
  headers: Vec<(String, String)>,
  body: Body,
}

impl Default for Request {
  fn default() -> Self {
    Self {
      method: Method::GET,
      url: None,
      parameters: Vec::new(),
      headers: Vec::new(),
      body: Body::Empty,
    }
  }
}

impl Request {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_url(mut self, url: Url) -> Self {
    self.url = Some(url);
    self
  }

  /// Parses and sets the target URL.
  pub fn try_with_url(self, url: &str) -> FlowResult<Self> {
    let parsed = Url::parse(url).map_err(|e| FlowError::Configuration(format!("invalid url '{}': {}", url, e)))?;
    Ok(self.with_url(parsed))
  }

  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  /// Appends a query parameter. Parameters are applied on top of any query
  /// already present in the URL when the request is sent.
  pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.parameters.push((name.into(), value.into()));
    self
  }

  /// Appends a header value. Existing values for the same name are kept.
  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// Appends a `Cookie` header carrying a single `name=value` pair.
  pub fn with_cookie(self, name: &str, value: &str) -> Self {
    self.with_header("Cookie", format!("{}={}", name, value))
  }

  /// Removes every value of a header (case-insensitive).
  pub fn without_header(mut self, name: &str) -> Self {
    self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    self
  }

  /// Sets a JSON body and switches the method to POST.
  pub fn with_json(mut self, body: Value) -> Self {
    self.method = Method::POST;
    self.body = Body::Json(body);
    self
  }

  /// Sets a form-encoded body and switches the method to POST.
  pub fn with_form<I, K, V>(mut self, fields: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    self.method = Method::POST;
    self.body = Body::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
    self
  }

  /// Sets one field of the JSON object body, turning an empty (or non-object)
  /// body into `{}` first. The method is left as is. Used by request adapters
  /// that contribute fields.
  pub fn with_json_field(mut self, name: impl Into<String>, value: Value) -> Self {
    let mut fields = match std::mem::take(&mut self.body) {
      Body::Json(Value::Object(fields)) => fields,
      _ => Map::new(),
    };
    fields.insert(name.into(), value);
    self.body = Body::Json(Value::Object(fields));
    self
  }

  pub fn method(&self) -> &Method {
    &self.method
  }

  pub fn url(&self) -> Option<&Url> {
    self.url.as_ref()
  }

  pub fn parameters(&self) -> &[(String, String)] {
    &self.parameters
  }

  pub fn headers(&self) -> &[(String, String)] {
    &self.headers
  }

  /// First value of a header (case-insensitive).
  pub fn header(&self, name: &str) -> Option<&str> {
    self.header_values(name).next()
  }

  /// Every value of a header, in insertion order (case-insensitive).
  pub fn header_values<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a str> + 'b
  where
    'a: 'b,
  {
    self
      .headers
      .iter()
      .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  pub fn body(&self) -> &Body {
    &self.body
  }

  /// The URL with all query parameters applied.
  pub fn full_url(&self) -> FlowResult<Url> {
    let mut url = self.url.clone().ok_or(FlowError::MissingUrl)?;
    if !self.parameters.is_empty() {
      let mut pairs = url.query_pairs_mut();
      for (name, value) in &self.parameters {
        pairs.append_pair(name, value);
      }
    }
    Ok(url)
  }
}
