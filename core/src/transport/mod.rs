// authflow/src/transport/mod.rs

//! The injectable HTTP boundary. The only place a workflow turn suspends.

pub mod mock;
pub mod reqwest_client;

use crate::core::request::Request;
use crate::core::response::Response;
use async_trait::async_trait;

pub use self::mock::MockHttpClient;
pub use self::reqwest_client::ReqwestHttpClient;

/// Performs one HTTP exchange.
///
/// Implementations must not retry or follow flow logic; they return the
/// server's answer (any status) as a `Response` and reserve `Err` for
/// transport-level failures, which the workflow reports unchanged.
#[async_trait]
pub trait HttpClient: Send + Sync {
  async fn send(&self, request: Request) -> anyhow::Result<Response>;
}
