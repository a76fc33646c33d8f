// authflow/src/modules/cookie.rs

//! Keeps the server's session cookies across the turns of a flow, and across
//! workflow instances for the cookies named in `persist`.
//!
//! The jar lives in the `SharedContext` under `COOKIE_JAR_KEY`. Persisted
//! cookies are stored as one JSON object (`name -> value`) under
//! `CookieConfig::storage_key`.

use crate::core::request::Request;
use crate::core::response::Response;
use crate::core::shared_context::SharedContext;
use crate::module::Module;
use crate::storage::{MemoryStorage, Storage};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{event, Level};

pub const COOKIE_JAR_KEY: &str = "authflow.cookie.jar";

/// Cookie name to value, in name order.
pub type CookieJar = BTreeMap<String, String>;

#[derive(Clone)]
pub struct CookieConfig {
  /// Names of the cookies that outlive the workflow instance.
  pub persist: Vec<String>,
  pub storage: Arc<dyn Storage>,
  pub storage_key: String,
}

impl Default for CookieConfig {
  fn default() -> Self {
    Self {
      persist: Vec::new(),
      storage: Arc::new(MemoryStorage::new()),
      storage_key: "authflow.cookies".to_string(),
    }
  }
}

impl fmt::Debug for CookieConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CookieConfig")
      .field("persist", &self.persist)
      .field("storage_key", &self.storage_key)
      .finish_non_exhaustive()
  }
}

impl CookieConfig {
  pub fn persist(&mut self, name: impl Into<String>) -> &mut Self {
    self.persist.push(name.into());
    self
  }

  pub fn storage(&mut self, storage: Arc<dyn Storage>) -> &mut Self {
    self.storage = storage;
    self
  }

  fn clone_storage(&self) -> (Arc<dyn Storage>, String) {
    (Arc::clone(&self.storage), self.storage_key.clone())
  }
}

/// One parsed `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SetCookie {
  pub(crate) name: String,
  pub(crate) value: String,
  /// `Max-Age` of zero or less: the server deletes the cookie.
  pub(crate) expired: bool,
}

/// Parses `name=value; Attr=...; Attr`. Attributes other than `Max-Age` are ignored.
pub(crate) fn parse_set_cookie(header: &str) -> Option<SetCookie> {
  let mut parts = header.split(';');
  let (name, value) = parts.next()?.split_once('=')?;
  let name = name.trim();
  if name.is_empty() {
    return None;
  }
  let expired = parts.filter_map(|attr| attr.split_once('=')).any(|(key, value)| {
    key.trim().eq_ignore_ascii_case("max-age") && value.trim().parse::<i64>().map(|age| age <= 0).unwrap_or(false)
  });
  Some(SetCookie {
    name: name.to_string(),
    value: value.trim().trim_matches('"').to_string(),
    expired,
  })
}

fn jar(context: &SharedContext) -> anyhow::Result<CookieJar> {
  Ok(context.get_or(COOKIE_JAR_KEY, CookieJar::new())?)
}

fn with_cookies(context: &SharedContext, request: Request) -> anyhow::Result<Request> {
  Ok(
    jar(context)?
      .iter()
      .fold(request, |request, (name, value)| request.with_cookie(name, value)),
  )
}

/// Merges the response's cookies into the jar. Returns the names that changed.
fn absorb(context: &SharedContext, response: &Response) -> anyhow::Result<Vec<String>> {
  let parsed: Vec<SetCookie> = response.set_cookies().filter_map(parse_set_cookie).collect();
  if parsed.is_empty() {
    return Ok(Vec::new());
  }
  let names = parsed.iter().map(|c| c.name.clone()).collect();
  context.update::<CookieJar, _>(COOKIE_JAR_KEY, |current| {
    let mut jar = current.cloned().unwrap_or_default();
    for cookie in parsed {
      if cookie.expired {
        jar.remove(&cookie.name);
      } else {
        jar.insert(cookie.name, cookie.value);
      }
    }
    jar
  })?;
  Ok(names)
}

async fn load(context: SharedContext, storage: Arc<dyn Storage>, key: String) -> anyhow::Result<()> {
  let Some(raw) = storage.get(&key).await? else {
    return Ok(());
  };
  let stored: CookieJar = serde_json::from_str(&raw)?;
  event!(Level::DEBUG, cookies = stored.len(), "Loaded persisted cookies.");
  context.update::<CookieJar, _>(COOKIE_JAR_KEY, |current| {
    let mut jar = current.cloned().unwrap_or_default();
    jar.extend(stored);
    jar
  })?;
  Ok(())
}

async fn persist(
  context: SharedContext,
  storage: Arc<dyn Storage>,
  key: String,
  names: Vec<String>,
  changed: Vec<String>,
) -> anyhow::Result<()> {
  if !changed.iter().any(|name| names.contains(name)) {
    return Ok(());
  }
  let kept: CookieJar = jar(&context)?.into_iter().filter(|(name, _)| names.contains(name)).collect();
  if kept.is_empty() {
    storage.delete(&key).await
  } else {
    event!(Level::DEBUG, cookies = kept.len(), "Persisting cookies.");
    storage.save(&key, serde_json::to_string(&kept)?).await
  }
}

async fn forget(context: SharedContext, storage: Arc<dyn Storage>, key: String) -> anyhow::Result<()> {
  context.remove(COOKIE_JAR_KEY);
  storage.delete(&key).await
}

pub static COOKIE: Lazy<Module<CookieConfig>> = Lazy::new(|| {
  Module::<CookieConfig>::of("cookie", |setup| {
    let config = setup.config();
    setup.init(move |ctx| {
      let (storage, key) = config.read().clone_storage();
      load(ctx, storage, key)
    });

    setup.start(|ctx, request| {
      let result = with_cookies(&ctx, request);
      async move { result }
    });

    setup.next(|ctx, _node, request| {
      let result = with_cookies(&ctx, request);
      async move { result }
    });

    let config = setup.config();
    setup.response(move |ctx, response| {
      let (storage, key) = config.read().clone_storage();
      let names = config.read().persist.clone();
      let changed = absorb(&ctx, &response);
      async move { persist(ctx, storage, key, names, changed?).await }
    });

    // Attach first, then clear: the server needs the cookies to end the session.
    let config = setup.config();
    setup.sign_off(move |ctx, request| {
      let (storage, key) = config.read().clone_storage();
      let result = with_cookies(&ctx, request);
      async move {
        let request = result?;
        forget(ctx, storage, key).await?;
        Ok::<_, anyhow::Error>(request)
      }
    });
  })
});
