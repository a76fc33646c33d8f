// tests/context_management_tests.rs
mod common;

use authflow::{FlowError, Module, SharedContext};
use common::*;

#[test]
fn test_shared_context_clone_shares_data() {
  setup_tracing();
  let original = SharedContext::new();
  let cloned = original.clone();

  original.set("counter", 5_i32);
  assert_eq!(cloned.get::<i32>("counter").unwrap(), Some(5));

  cloned.update::<i32, _>("counter", |n| n.copied().unwrap_or(0) * 2).unwrap();
  assert_eq!(original.get::<i32>("counter").unwrap(), Some(10));
  assert!(cloned.remove("counter"));
  assert!(original.is_empty());
}

#[tokio::test]
async fn test_value_set_by_one_module_is_read_by_another() {
  setup_tracing();
  // "producer" stores the server's interaction id, "consumer" forwards it on the next request.
  let producer = Module::<()>::of("producer", |setup| {
    setup.response(|ctx, response| {
      if let Some(id) = response.header("X-Interaction-Id") {
        ctx.set("interaction_id", id.to_string());
      }
      async { Ok(()) }
    });
  });
  let consumer = Module::<()>::of("consumer", |setup| {
    setup.next(|ctx, _node, request| {
      let id = ctx.get::<String>("interaction_id");
      async move {
        Ok(match id? {
          Some(id) => request.with_header("X-Interaction-Id", id),
          None => request,
        })
      }
    });
  });

  let transport = std::sync::Arc::new(authflow::MockHttpClient::new());
  transport
    .enqueue(200, vec![("X-Interaction-Id".into(), "ia-42".into())], "{}")
    .enqueue(200, vec![], "{}");
  let mut config = config_with(transport.clone());
  config
    .module(&consumer, |_| {})
    .module(&producer, |_| {})
    .module(&continue_then_succeed(), |_| {});
  let workflow = build(config);

  let node = workflow.start().await.next().await;
  assert_eq!(node.kind(), "success");
  let requests = transport.requests();
  assert_eq!(requests[0].header("X-Interaction-Id"), None);
  assert_eq!(requests[1].header("X-Interaction-Id"), Some("ia-42"));
}

#[tokio::test]
async fn test_wrong_type_read_in_a_hook_fails_the_turn() {
  setup_tracing();
  let module = Module::<()>::of("confused", |setup| {
    setup.init(|ctx| {
      ctx.set("attempts", 1_u8);
      async { Ok(()) }
    });
    setup.start(|ctx, request| {
      let attempts = ctx.get::<String>("attempts");
      async move {
        attempts?;
        Ok(request)
      }
    });
  });
  let mut config = config_with(ok_transport());
  config.module(&module, |_| {});
  let workflow = build(config);

  let node = workflow.start().await;
  match node.as_failure().and_then(|f| f.downcast_ref::<FlowError>()) {
    Some(FlowError::TypeMismatch { key, expected, actual }) => {
      assert_eq!(key, "attempts");
      assert!(expected.contains("String"));
      assert_eq!(*actual, "u8");
    }
    other => panic!("Expected TypeMismatch, got {:?}", other),
  }
}

#[tokio::test]
async fn test_registration_config_is_shared_by_its_hooks() {
  setup_tracing();
  #[derive(Default)]
  struct Retries {
    limit: u32,
    seen: u32,
  }
  // response records, node reads: both hooks see the same registration config.
  let module = Module::<Retries>::of("retries", |setup| {
    let config = setup.config();
    setup.response(move |_ctx, _response| {
      config.write().seen += 1;
      async { Ok(()) }
    });
    let config = setup.config();
    setup.node(move |ctx, node| {
      let (seen, limit) = {
        let guard = config.read();
        (guard.seen, guard.limit)
      };
      ctx.set("seen_of_limit", format!("{}/{}", seen, limit));
      async move { Ok(node) }
    });
  });

  let mut config = config_with(ok_transport());
  config
    .module(&module, |c| c.limit = 3)
    .module(&continue_then_succeed(), |_| {});
  let workflow = build(config);

  let node = workflow.start().await;
  assert_eq!(workflow.context().get::<String>("seen_of_limit").unwrap().as_deref(), Some("1/3"));
  node.next().await;
  assert_eq!(workflow.context().get::<String>("seen_of_limit").unwrap().as_deref(), Some("2/3"));
}
