// src/lib.rs

//! Authflow: an ASYNC, module-driven engine for multi-step, server-guided
//! authentication flows.
//!
//! A flow is a conversation with an authorization server. Each turn sends one
//! request and turns the response into a `Node`:
//!  - `ContinueNode`: the server wants more input. Fill in its actions, call `next()`.
//!  - `SuccessNode`: authenticated; carries an opaque `Session`.
//!  - `ErrorNode`: the server rejected the input; may carry a retry node.
//!  - `FailureNode`: something broke; carries the original error unchanged.
//!
//! The engine itself knows nothing about any particular server. All behaviour
//! comes from modules: named bundles of optional hooks over eight stages
//! (init, start, next, response, transform, node, success, sign_off),
//! registered on a `WorkflowConfig` with a priority and an override mode.

pub mod core;
pub mod error;
pub mod module;
pub mod modules;
pub mod storage;
pub mod transport;
pub mod workflow;

// --- Re-exports for the Public API ---

// Data flowing through a turn
pub use crate::core::action::{Action, RequestAdapter};
pub use crate::core::config_data::ConfigData;
pub use crate::core::node::{ContinueNode, ErrorNode, FailureNode, JsonObject, Node, Session, SuccessNode};
pub use crate::core::request::{Body, Request};
pub use crate::core::response::Response;
pub use crate::core::shared_context::SharedContext;

// Module authoring and registration
pub use crate::module::{Module, ModuleId, ModuleOptions, OverrideMode, RegistrationInfo, Setup, DEFAULT_PRIORITY};

// The executor
pub use crate::workflow::{Workflow, WorkflowConfig, DEFAULT_TIMEOUT};

// Collaborators
pub use crate::storage::{MemoryStorage, Storage};
pub use crate::transport::{HttpClient, MockHttpClient, ReqwestHttpClient};

pub use crate::error::{FlowError, FlowResult};

/*
    Core Workflow:
    1. Declare modules as `Lazy<Module<Config>>` statics (or use the stock ones in `modules`).
       The setup closure reads its registration's config and installs stage hooks:
       `setup.start(..)`, `setup.transform(..)`, `setup.sign_off(..)`, ...
    2. Build a `WorkflowConfig`, registering modules with `.module(&M, |cfg| ..)` or
       `.module_with(&M, ModuleOptions::new().priority(5).append(), |cfg| ..)`.
    3. `Workflow::new(config)` installs every registration's hooks in priority order.
    4. `workflow.start().await` returns the first `Node`; keep calling `node.next().await`
       on continuations until a terminal node comes back.
    5. `workflow.sign_off().await` ends the session.
*/
