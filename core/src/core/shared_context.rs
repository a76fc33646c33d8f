// authflow/src/core/shared_context.rs

//! The per-workflow key/value namespace every module hook can see.

use crate::error::{FlowError, FlowResult};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

struct Entry {
  type_name: &'static str,
  value: Box<dyn Any + Send + Sync>,
}

/// A mutable mapping from string keys to values of arbitrary type, created once
/// per `Workflow` and shared by all of its hooks.
///
/// Writes are last-write-wins. Reads are typed: asking for a key with the wrong
/// type fails with `FlowError::TypeMismatch` instead of coercing.
///
/// Like the module configuration handles, the lock behind this type is blocking,
/// so no method here holds it across an `.await`. Hooks should copy values out
/// before suspending.
#[derive(Clone, Default)]
pub struct SharedContext(Arc<RwLock<HashMap<String, Entry>>>);

impl SharedContext {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stores `value` under `key`, replacing whatever was there (of any type).
  pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
    self.0.write().insert(
      key.into(),
      Entry {
        type_name: std::any::type_name::<T>(),
        value: Box::new(value),
      },
    );
  }

  /// Returns a clone of the value stored under `key`.
  ///
  /// `Ok(None)` if the key is absent, `Err(TypeMismatch)` if it holds another type.
  pub fn get<T: Any + Send + Sync + Clone>(&self, key: &str) -> FlowResult<Option<T>> {
    let guard = self.0.read();
    match guard.get(key) {
      None => Ok(None),
      Some(entry) => entry
        .value
        .downcast_ref::<T>()
        .cloned()
        .map(Some)
        .ok_or_else(|| mismatch::<T>(key, entry)),
    }
  }

  /// Like `get`, but falls back to `default` when the key is absent.
  pub fn get_or<T: Any + Send + Sync + Clone>(&self, key: &str, default: T) -> FlowResult<T> {
    Ok(self.get(key)?.unwrap_or(default))
  }

  /// Atomically reads, transforms and stores the value under `key`, returning the new value.
  ///
  /// `f` receives `None` when the key is absent.
  pub fn update<T, F>(&self, key: &str, f: F) -> FlowResult<T>
  where
    T: Any + Send + Sync + Clone,
    F: FnOnce(Option<&T>) -> T,
  {
    let mut guard = self.0.write();
    let next = match guard.get(key) {
      None => f(None),
      Some(entry) => match entry.value.downcast_ref::<T>() {
        Some(current) => f(Some(current)),
        None => return Err(mismatch::<T>(key, entry)),
      },
    };
    guard.insert(
      key.to_string(),
      Entry {
        type_name: std::any::type_name::<T>(),
        value: Box::new(next.clone()),
      },
    );
    Ok(next)
  }

  /// Removes `key`. Returns whether anything was stored there.
  pub fn remove(&self, key: &str) -> bool {
    self.0.write().remove(key).is_some()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.0.read().contains_key(key)
  }

  pub fn keys(&self) -> Vec<String> {
    self.0.read().keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.0.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.read().is_empty()
  }

  pub fn clear(&self) {
    self.0.write().clear();
  }
}

fn mismatch<T>(key: &str, entry: &Entry) -> FlowError {
  FlowError::TypeMismatch {
    key: key.to_string(),
    expected: std::any::type_name::<T>(),
    actual: entry.type_name,
  }
}

impl fmt::Debug for SharedContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let guard = self.0.read();
    let mut map = f.debug_map();
    for (key, entry) in guard.iter() {
      map.entry(key, &entry.type_name);
    }
    map.finish()
  }
}
