// authflow/examples/basic_flow.rs

use authflow::modules::{COOKIE, CUSTOM_HEADER, ENDPOINT, JSON_TRANSFORM};
use authflow::{Action, MockHttpClient, Node, Request, RequestAdapter, SharedContext, Workflow};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use tracing::info;

// 1. A collector: the caller fills it in, the ContinueNode submits it.
struct Field {
  name: String,
  value: Mutex<String>,
}

impl RequestAdapter for Field {
  fn adapt(&self, _context: &SharedContext, request: Request) -> anyhow::Result<Request> {
    Ok(request.with_json_field(self.name.clone(), json!(self.value.lock().clone())))
  }
}

impl Action for Field {
  fn as_any(&self) -> &dyn Any {
    self
  }

  fn request_adapter(&self) -> Option<&dyn RequestAdapter> {
    Some(self)
  }
}

// 2. A canned server: a login form, then a session.
fn fake_server() -> Arc<MockHttpClient> {
  let server = MockHttpClient::new();
  server
    .enqueue(
      200,
      vec![
        ("Content-Type".into(), "application/json".into()),
        ("Set-Cookie".into(), "interactionId=ia-7; Path=/; HttpOnly".into()),
      ],
      json!({
        "id": "login",
        "fields": ["username", "password"],
        "_links": {"next": {"href": "/flows/login/submit"}}
      })
      .to_string(),
    )
    .enqueue_json(200, json!({"session": {"access_token": "at-123", "expires_in": 3600}}))
    .enqueue(204, vec![], "");
  Arc::new(server)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Flow Example ---");

  let server = fake_server();

  // 3. Configure the workflow from stock modules.
  let workflow = Workflow::configure(|cfg| {
    cfg
      .name("login")
      .http_client(server.clone())
      .module(&ENDPOINT, |c| {
        c.start_url = Some("https://auth.example.com/flows".into());
        c.sign_off_url = Some("https://auth.example.com/flows/signoff".into());
        c.parameter("client_id", "demo-app");
      })
      .module(&CUSTOM_HEADER, |c| {
        c.header("X-Client", "basic_flow-example");
      })
      .module(&COOKIE, |_| {})
      .module(&JSON_TRANSFORM, |c| {
        c.actions(|input| {
          input
            .get("fields")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .map(|name| {
              Arc::new(Field {
                name: name.to_string(),
                value: Mutex::new(String::new()),
              }) as Arc<dyn Action>
            })
            .collect()
        });
      });
  })?;

  // 4. Drive the flow until it reaches a terminal node.
  let mut node = workflow.start().await;
  loop {
    match &node {
      Node::Continue(step) => {
        info!("Step '{}' wants input.", step.input()["id"]);
        for field in step.actions_of::<Field>() {
          let value = if field.name == "password" { "hunter2" } else { "ada" };
          *field.value.lock() = value.to_string();
        }
        node = step.next().await;
      }
      Node::Success(success) => {
        let session = success.session().get::<Value>();
        info!("Signed in. Session: {:?}", session);
        break;
      }
      Node::Error(error) => {
        info!("Server rejected the input: {}", error.message());
        break;
      }
      Node::Failure(failure) => {
        info!("Flow failed: {}", failure.message());
        break;
      }
    }
  }

  // 5. End the session; cookies go along, then the jar is cleared.
  workflow.sign_off().await?;

  for request in server.requests() {
    info!(
      "{} {} cookies={:?}",
      request.method(),
      request.full_url()?,
      request.header_values("Cookie").collect::<Vec<_>>()
    );
  }
  info!("--- Basic Flow Example Complete ---");
  Ok(())
}
