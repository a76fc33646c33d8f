// tests/pipeline_execution_tests.rs
mod common;
use authflow::modules::JSON_TRANSFORM;
use authflow::{Action, Body, ContinueNode, ErrorNode, JsonObject, MockHttpClient, Module, Node, Session, SuccessNode};
use common::*;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct StageCounters {
  init: AtomicUsize,
  start: AtomicUsize,
  next: AtomicUsize,
  response: AtomicUsize,
  transform: AtomicUsize,
  node: AtomicUsize,
  success: AtomicUsize,
}

fn bump(counter: &AtomicUsize) -> usize {
  counter.fetch_add(1, Ordering::SeqCst) + 1
}

/// One module with a hook at every turn stage. Its transform answers Continue
/// on the first call and Success afterwards.
fn all_stages_module(counters: Arc<StageCounters>) -> Module<()> {
  Module::<()>::of("all_stages", move |setup| {
    let c = counters.clone();
    setup.init(move |ctx| {
      bump(&c.init);
      ctx.update::<i32, _>("counter", |n| n.copied().unwrap_or(0) + 1).ok();
      async { Ok(()) }
    });
    let c = counters.clone();
    setup.start(move |ctx, request| {
      bump(&c.start);
      ctx.update::<i32, _>("counter", |n| n.copied().unwrap_or(0) + 1).ok();
      async move { Ok(request) }
    });
    let c = counters.clone();
    setup.next(move |ctx, _node, request| {
      bump(&c.next);
      ctx.update::<i32, _>("counter", |n| n.copied().unwrap_or(0) + 1).ok();
      async move { Ok(request) }
    });
    let c = counters.clone();
    setup.response(move |ctx, _response| {
      bump(&c.response);
      ctx.update::<i32, _>("counter", |n| n.copied().unwrap_or(0) + 1).ok();
      async { Ok(()) }
    });
    let c = counters.clone();
    setup.transform(move |ctx, _response| {
      let call = bump(&c.transform);
      ctx.update::<i32, _>("counter", |n| n.copied().unwrap_or(0) + 1).ok();
      let node = if call == 1 {
        Node::Continue(ContinueNode::new(JsonObject::new()).with_request(authflow::Request::new().with_url(
          FLOW_URL.parse().expect("valid test url"),
        )))
      } else {
        Node::Success(SuccessNode::new(Session::new("token".to_string())))
      };
      async move { Ok(Some(node)) }
    });
    let c = counters.clone();
    setup.node(move |ctx, node| {
      bump(&c.node);
      ctx.update::<i32, _>("counter", |n| n.copied().unwrap_or(0) + 1).ok();
      async move { Ok(node) }
    });
    let c = counters.clone();
    setup.success(move |ctx, success| {
      bump(&c.success);
      ctx.update::<i32, _>("counter", |n| n.copied().unwrap_or(0) + 1).ok();
      async move { Ok(success) }
    });
  })
}

#[tokio::test]
async fn test_continue_once_then_succeed_invokes_each_stage_exactly() {
  setup_tracing();
  let counters = Arc::new(StageCounters::default());
  let mut config = config_with(ok_transport());
  config.module(&all_stages_module(counters.clone()), |_| {});
  let workflow = build(config);

  let first = workflow.start().await;
  let next = first.as_continue().expect("first turn continues");
  assert!(next.is_attached());
  let last = next.next().await;
  assert!(last.as_success().is_some(), "got {:?}", last);

  assert_eq!(counters.init.load(Ordering::SeqCst), 1);
  assert_eq!(counters.start.load(Ordering::SeqCst), 1);
  assert_eq!(counters.next.load(Ordering::SeqCst), 1);
  assert_eq!(counters.response.load(Ordering::SeqCst), 2);
  assert_eq!(counters.transform.load(Ordering::SeqCst), 2);
  assert_eq!(counters.node.load(Ordering::SeqCst), 2);
  assert_eq!(counters.success.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shared_context_counter_reaches_ten_over_two_turns() {
  setup_tracing();
  let mut config = config_with(ok_transport());
  config.module(&all_stages_module(Arc::new(StageCounters::default())), |_| {});
  let workflow = build(config);

  let node = workflow.start().await;
  let node = node.next().await;
  assert_eq!(node.kind(), "success");
  assert_eq!(workflow.context().get::<i32>("counter").unwrap(), Some(10));
}

#[tokio::test]
async fn test_start_and_next_hooks_fold_in_order() {
  setup_tracing();
  let journal = Journal::new();
  let (a, b) = (recording_module("a", &journal), recording_module("b", &journal));
  let transport = ok_transport();
  let mut config = config_with(transport.clone());
  config
    .module(&a, |c| c.header = Some(("X-Step".into(), "a".into())))
    .module(&b, |c| c.header = Some(("X-Step".into(), "b".into())))
    .module(&continue_then_succeed(), |_| {});
  let workflow = build(config);

  let node = workflow.start().await;
  node.next().await;

  let requests = transport.requests();
  assert_eq!(requests.len(), 2);
  for request in &requests {
    let steps: Vec<&str> = request.header_values("x-step").collect();
    assert_eq!(steps, vec!["a", "b"]);
  }
  assert_eq!(requests[0].url().unwrap().as_str(), FLOW_URL);
  assert_eq!(requests[1].method(), &reqwest::Method::POST);
}

fn field_factory(input: &JsonObject) -> Vec<Arc<dyn Action>> {
  input
    .get("fields")
    .and_then(Value::as_array)
    .map(|fields| {
      fields
        .iter()
        .filter_map(Value::as_str)
        .map(|key| Arc::new(TextField::new(key)) as Arc<dyn Action>)
        .collect()
    })
    .unwrap_or_default()
}

#[tokio::test]
async fn test_next_submits_collected_action_values() {
  setup_tracing();
  let transport = Arc::new(MockHttpClient::new());
  transport
    .enqueue_json(
      200,
      json!({
        "id": "login",
        "fields": ["username", "password"],
        "_links": {"next": {"href": "https://auth.example.com/flows/login"}}
      }),
    )
    .enqueue_json(200, json!({"session": {"access_token": "at-1"}}));
  let mut config = config_with(transport.clone());
  config.module(&JSON_TRANSFORM, |c| {
    c.actions(field_factory);
  });
  let workflow = build(config);

  let node = workflow.start().await;
  let step = node.as_continue().expect("login step");
  assert_eq!(step.input()["id"], "login");
  let values = ["ada", "s3cret"];
  for (field, value) in step.actions_of::<TextField>().zip(values) {
    field.set(value);
  }

  let node = step.next().await;
  let session = node.as_success().expect("signed in").session();
  assert_eq!(session.get::<Value>().unwrap()["access_token"], "at-1");

  let submitted = &transport.requests()[1];
  assert_eq!(submitted.url().unwrap().as_str(), "https://auth.example.com/flows/login");
  assert_eq!(submitted.body(), &Body::Json(json!({"username": "ada", "password": "s3cret"})));
}

#[tokio::test]
async fn test_first_transform_to_produce_a_node_wins() {
  setup_tracing();
  let journal = Journal::new();
  let observer = recording_module("observer", &journal);
  let late = recording_module("late", &journal);
  let winner = Module::<()>::of("winner", |setup| {
    setup.transform(|_ctx, response| {
      let node = Node::Error(ErrorNode::new(JsonObject::new(), format!("status {}", response.status())));
      async move { Ok(Some(node)) }
    });
  });
  let loser = Module::<()>::of("loser", |setup| {
    setup.transform(|_ctx, _response| async { Ok(Some(Node::Success(SuccessNode::new(Session::empty())))) });
  });

  let mut config = config_with(ok_transport());
  config
    .module(&observer, |_| {})
    .module(&winner, |_| {})
    .module(&loser, |_| {})
    .module(&late, |_| {});
  let workflow = build(config);

  let node = workflow.start().await;
  assert_eq!(node.as_error().map(|e| e.message()), Some("status 200"));
  assert_eq!(journal.stage("transform"), vec!["observer:transform"]);
  // Node hooks still run for every module, including those after the winner.
  assert_eq!(journal.stage("node"), vec!["observer:node", "late:node"]);
}

#[tokio::test]
async fn test_workflow_instances_are_isolated() {
  setup_tracing();
  let build_one = |counters: Arc<StageCounters>| {
    let mut config = config_with(ok_transport());
    config.module(&all_stages_module(counters), |_| {});
    build(config)
  };
  let (first_counters, second_counters) = (Arc::new(StageCounters::default()), Arc::new(StageCounters::default()));
  let (first, second) = (build_one(first_counters.clone()), build_one(second_counters.clone()));

  let (a, b) = tokio::join!(first.start(), second.start());
  assert_eq!(a.kind(), "continue");
  assert_eq!(b.kind(), "continue");
  // init + start + response + transform + node, each instance on its own.
  assert_eq!(first.context().get::<i32>("counter").unwrap(), Some(5));
  assert_eq!(second.context().get::<i32>("counter").unwrap(), Some(5));
  assert_eq!(first_counters.init.load(Ordering::SeqCst), 1);
  assert_eq!(second_counters.init.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_node_and_success_hooks_fold_rewrites_in_order() {
  setup_tracing();
  let exchanger = Module::<()>::of("exchanger", |setup| {
    setup.transform(|_ctx, _response| async {
      Ok(Some(Node::Success(SuccessNode::new(Session::new("authorization-code".to_string())))))
    });
    setup.node(|_ctx, node| async move {
      Ok(match node {
        Node::Success(success) => {
          let mut input = success.input().clone();
          input.insert("tagged_by".into(), json!("exchanger"));
          Node::Success(success.with_input(input))
        }
        other => other,
      })
    });
    setup.success(|_ctx, success| async move { Ok(success.with_session(Session::new("access-token".to_string()))) });
  });
  let auditor = Module::<()>::of("auditor", |setup| {
    setup.node(|ctx, node| {
      let tag = node.as_success().and_then(|s| s.input().get("tagged_by")).cloned();
      ctx.set("audit.node_tag", tag);
      async move { Ok(node) }
    });
    setup.success(|ctx, success| {
      ctx.set("audit.session", success.session().get::<String>().cloned());
      async move { Ok(success) }
    });
  });

  let mut config = config_with(ok_transport());
  config.module(&exchanger, |_| {}).module(&auditor, |_| {});
  let workflow = build(config);

  let node = workflow.start().await;
  let success = node.as_success().unwrap_or_else(|| panic!("Expected SuccessNode, got {:?}", node));
  assert_eq!(success.session().get::<String>().map(String::as_str), Some("access-token"));
  assert_eq!(success.input()["tagged_by"], "exchanger");

  let context = workflow.context();
  assert_eq!(
    context.get::<Option<Value>>("audit.node_tag").unwrap(),
    Some(Some(json!("exchanger")))
  );
  assert_eq!(
    context.get::<Option<String>>("audit.session").unwrap(),
    Some(Some("access-token".to_string()))
  );
}
