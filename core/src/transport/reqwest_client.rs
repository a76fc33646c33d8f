// authflow/src/transport/reqwest_client.rs

//! Default transport backed by `reqwest`.

use crate::core::request::{Body, Request};
use crate::core::response::Response;
use crate::error::{FlowError, FlowResult};
use crate::transport::HttpClient;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{event, Level};

#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
  http: Client,
}

impl ReqwestHttpClient {
  pub fn new(timeout: Duration) -> FlowResult<Self> {
    let http = Client::builder()
      .timeout(timeout)
      .user_agent(format!("authflow/{}", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| FlowError::Transport { source: e.into() })?;
    Ok(Self { http })
  }

  /// Wraps a preconfigured client (proxies, custom TLS roots, ...).
  pub fn from_client(http: Client) -> Self {
    Self { http }
  }
}

impl ReqwestHttpClient {
  fn prepare(&self, request: &Request) -> anyhow::Result<reqwest::RequestBuilder> {
    let url = request.full_url()?;
    let mut builder = self.http.request(request.method().clone(), url);
    for (name, value) in request.headers() {
      builder = builder.header(name.as_str(), value.as_str());
    }
    Ok(match request.body() {
      Body::Empty => builder,
      Body::Json(value) => builder
        .header(CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(value)?),
      Body::Form(fields) => {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
          .extend_pairs(fields.iter())
          .finish();
        builder
          .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
          .body(encoded)
      }
    })
  }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
  async fn send(&self, request: Request) -> anyhow::Result<Response> {
    let http_response = self.prepare(&request)?.send().await?;
    let status = http_response.status().as_u16();
    let headers = http_response
      .headers()
      .iter()
      .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
      .collect();
    let body = http_response.bytes().await?;
    event!(Level::TRACE, status, body_len = body.len(), "HTTP exchange finished.");
    Ok(Response::new(request, status, headers, body))
  }
}
