// authflow/src/core/config_data.rs

//! Per-registration configuration handle handed to a module's hooks.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// One registration's configuration, shared by every hook that registration
/// installed. Clones point at the same value; other registrations of the same
/// module (APPEND) have their own.
///
/// Guards are blocking and must be dropped before any `.await` in a hook.
#[derive(Debug)]
pub struct ConfigData<C: Send + Sync + 'static>(Arc<RwLock<C>>);

impl<C: Send + Sync + 'static> ConfigData<C> {
  pub fn new(config: C) -> Self {
    ConfigData(Arc::new(RwLock::new(config)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, C> {
    self.0.read()
  }

  /// Changes made here are seen by every later hook of the registration.
  pub fn write(&self) -> RwLockWriteGuard<'_, C> {
    self.0.write()
  }

  /// Clones the current value out from under the lock.
  pub fn snapshot(&self) -> C
  where
    C: Clone,
  {
    self.read().clone()
  }
}

impl<C: Send + Sync + 'static> Clone for ConfigData<C> {
  fn clone(&self) -> Self {
    ConfigData(Arc::clone(&self.0))
  }
}
