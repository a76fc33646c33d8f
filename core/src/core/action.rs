// authflow/src/core/action.rs

//! Capabilities the engine expects from the collaborator-defined values carried
//! on a `ContinueNode` (collectors, callbacks, ...).

use crate::core::request::Request;
use crate::core::shared_context::SharedContext;
use std::any::Any;

/// Rewrites an outgoing request. Pure: no network I/O.
///
/// Actions that contribute user input to the next turn (a collected username,
/// a selected device) implement this and are applied in action order when the
/// `ContinueNode` builds its request.
pub trait RequestAdapter: Send + Sync {
  fn adapt(&self, context: &SharedContext, request: Request) -> anyhow::Result<Request>;
}

/// Anything attachable to `ContinueNode::actions`.
///
/// The engine does not know what an action means. It only iterates actions in
/// list order, filters them by concrete type (`as_any`) and asks whether they
/// can adapt requests. Actions may keep interior mutable state (the value the
/// user typed) that the caller sets before calling `next()`.
pub trait Action: Any + Send + Sync {
  fn as_any(&self) -> &dyn Any;

  /// `Some` if this action contributes to the next request.
  fn request_adapter(&self) -> Option<&dyn RequestAdapter> {
    None
  }

  /// Short label used in logs and `Debug` output.
  fn name(&self) -> &str {
    std::any::type_name::<Self>()
  }
}
