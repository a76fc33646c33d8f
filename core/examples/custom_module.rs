// authflow/examples/custom_module.rs

use authflow::{MockHttpClient, Module, ModuleOptions, Node, Response, Session, SuccessNode, Workflow};
use once_cell::sync::Lazy;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

// 1. A module's configuration: one value per registration.
#[derive(Debug, Clone, Default)]
struct ApiKeyConfig {
  key: String,
  header: String,
}

// 2. Modules are templates declared once; every registration shares this identity.
static API_KEY: Lazy<Module<ApiKeyConfig>> = Lazy::new(|| {
  Module::<ApiKeyConfig>::of("api_key", |setup| {
    let config = setup.config();
    setup.start(move |_ctx, request| {
      let ApiKeyConfig { key, header } = config.snapshot();
      async move { Ok(request.with_header(header, key)) }
    });
  })
});

// 3. A transform that understands a one-shot token endpoint.
static TOKEN: Lazy<Module<()>> = Lazy::new(|| {
  Module::<()>::of("token", |setup| {
    setup.transform(|_ctx, response: Response| {
      let token = response
        .json()
        .ok()
        .and_then(|body| body.get("token"))
        .and_then(|t| t.as_str())
        .map(str::to_string);
      async move { Ok(token.map(|t| Node::Success(SuccessNode::new(Session::new(t))))) }
    });
  })
});

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

  info!("--- Custom Module Example ---");

  let server = Arc::new(MockHttpClient::new().with_responder(|request| {
    let authorized = request.header("X-Api-Key") == Some("second-key");
    Ok(Response::json_payload(
      request.clone(),
      if authorized { 200 } else { 401 },
      &json!({"token": if authorized { "tok-1" } else { "" }}),
    ))
  }));

  let workflow = Workflow::configure(|cfg| {
    cfg
      .http_client(server.clone())
      .module(&authflow::modules::ENDPOINT, |c| {
        c.start_url = Some("https://api.example.com/token".into())
      })
      // The token transform is registered first but runs last.
      .module_with(&TOKEN, ModuleOptions::new().priority(100), |_| {})
      .module(&API_KEY, |c| {
        c.header = "X-Api-Key".into();
        c.key = "first-key".into();
      })
      // REPLACE (the default) overlays the earlier config: the header name is kept.
      .module(&API_KEY, |c| c.key = "second-key".into());
  })?;

  for registration in workflow.modules() {
    info!(module = %registration.module, priority = registration.priority, "registered");
  }

  match workflow.start().await {
    Node::Success(success) => info!("Token: {:?}", success.session().get::<String>()),
    other => info!("Unexpected node: {:?}", other),
  }
  info!("--- Custom Module Example Complete ---");
  Ok(())
}
