// authflow/src/modules/endpoint.rs

//! Points the flow at its server: the entry request and the sign-off target.

use crate::core::request::Request;
use crate::module::Module;
use once_cell::sync::Lazy;
use reqwest::Method;

#[derive(Debug, Clone, Default)]
pub struct EndpointConfig {
  /// Target of the first request. Left alone when `None` so another module may set it.
  pub start_url: Option<String>,
  /// Defaults to GET.
  pub start_method: Option<Method>,
  /// Query parameters added to the first request.
  pub parameters: Vec<(String, String)>,
  /// Target of the sign-off request. Without it sign-off makes no network call.
  pub sign_off_url: Option<String>,
}

impl EndpointConfig {
  pub fn parameter(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
    self.parameters.push((name.into(), value.into()));
    self
  }

  fn apply_start(&self, mut request: Request) -> anyhow::Result<Request> {
    if let Some(url) = &self.start_url {
      request = request.try_with_url(url)?;
    }
    if let Some(method) = &self.start_method {
      request = request.with_method(method.clone());
    }
    for (name, value) in &self.parameters {
      request = request.with_parameter(name.clone(), value.clone());
    }
    Ok(request)
  }

  fn apply_sign_off(&self, request: Request) -> anyhow::Result<Request> {
    match &self.sign_off_url {
      Some(url) => Ok(request.try_with_url(url)?),
      None => Ok(request),
    }
  }
}

pub static ENDPOINT: Lazy<Module<EndpointConfig>> = Lazy::new(|| {
  Module::<EndpointConfig>::of("endpoint", |setup| {
    let config = setup.config();
    setup.start(move |_ctx, request| {
      let result = config.read().apply_start(request);
      async move { result }
    });

    let config = setup.config();
    setup.sign_off(move |_ctx, request| {
      let result = config.read().apply_sign_off(request);
      async move { result }
    });
  })
});
