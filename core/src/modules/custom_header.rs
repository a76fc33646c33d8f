// authflow/src/modules/custom_header.rs

//! Adds fixed headers (client version, tenant, ...) to every request of a flow.

use crate::core::request::Request;
use crate::module::Module;
use once_cell::sync::Lazy;

#[derive(Debug, Clone, Default)]
pub struct CustomHeaderConfig {
  pub headers: Vec<(String, String)>,
}

impl CustomHeaderConfig {
  pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  fn apply(&self, request: Request) -> Request {
    self
      .headers
      .iter()
      .fold(request, |request, (name, value)| request.with_header(name.clone(), value.clone()))
  }
}

pub static CUSTOM_HEADER: Lazy<Module<CustomHeaderConfig>> = Lazy::new(|| {
  Module::<CustomHeaderConfig>::of("custom_header", |setup| {
    let config = setup.config();
    setup.start(move |_ctx, request| {
      let request = config.read().apply(request);
      async move { Ok(request) }
    });

    let config = setup.config();
    setup.next(move |_ctx, _node, request| {
      let request = config.read().apply(request);
      async move { Ok(request) }
    });
  })
});
