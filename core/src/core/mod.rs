pub mod action;
pub mod config_data;
pub mod node;
pub mod request;
pub mod response;
pub mod shared_context;

// Re-export key types for easier access from other modules (and lib.rs)
pub use action::{Action, RequestAdapter};
pub use config_data::ConfigData;
pub use node::{ContinueNode, ErrorNode, FailureNode, JsonObject, Node, Session, SuccessNode};
pub use request::{Body, Request};
pub use response::Response;
pub use shared_context::SharedContext;
