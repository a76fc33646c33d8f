// authflow/src/storage.rs

//! Key/value persistence consumed by modules that outlive a single workflow
//! instance (cookies, tokens). The format of stored values is up to the module.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Storage: Send + Sync {
  async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
  async fn save(&self, key: &str, value: String) -> anyhow::Result<()>;
  async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Process-local storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage(Arc<Mutex<HashMap<String, String>>>);

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.0.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.lock().is_empty()
  }
}

#[async_trait]
impl Storage for MemoryStorage {
  async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
    Ok(self.0.lock().get(key).cloned())
  }

  async fn save(&self, key: &str, value: String) -> anyhow::Result<()> {
    self.0.lock().insert(key.to_string(), value);
    Ok(())
  }

  async fn delete(&self, key: &str) -> anyhow::Result<()> {
    self.0.lock().remove(key);
    Ok(())
  }
}
