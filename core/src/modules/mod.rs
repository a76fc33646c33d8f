// authflow/src/modules/mod.rs

//! Stock modules. Each one is a `Lazy` static so every registration of it
//! shares one identity; register them like any other module:
//!
//! ```rust,ignore
//! let workflow = Workflow::configure(|cfg| {
//!   cfg
//!     .module(&ENDPOINT, |c| c.start_url = Some("https://auth.example.com/flows".into()))
//!     .module(&COOKIE, |_| {})
//!     .module(&JSON_TRANSFORM, |_| {});
//! })?;
//! ```

pub mod cookie;
pub mod custom_header;
pub mod endpoint;
pub mod json_transform;

pub use cookie::{CookieConfig, CookieJar, COOKIE, COOKIE_JAR_KEY};
pub use custom_header::{CustomHeaderConfig, CUSTOM_HEADER};
pub use endpoint::{EndpointConfig, ENDPOINT};
pub use json_transform::{ActionFactory, JsonTransformConfig, JSON_TRANSFORM, LAST_CONTINUE_KEY};
