//! Process-wide manager installation
//!
//! The host application builds one [`AuthorizationManager`], installs it
//! exactly once, and hands the returned `Arc` to every adapter call site.

use crate::error::{AuthzError, Result};
use crate::manager::AuthorizationManager;
use std::sync::{Arc, OnceLock};
use tracing::info;

/// Install-once slot for a shared manager
#[derive(Debug, Default)]
pub struct ManagerSlot {
    cell: OnceLock<Arc<AuthorizationManager>>,
}

impl ManagerSlot {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Store `manager`; fails if the slot is already filled
    pub fn install(&self, manager: Arc<AuthorizationManager>) -> Result<Arc<AuthorizationManager>> {
        self.cell
            .set(manager.clone())
            .map_err(|_| AuthzError::ManagerAlreadyConfigured)?;
        Ok(manager)
    }

    /// Installed manager, if any
    pub fn get(&self) -> Option<Arc<AuthorizationManager>> {
        self.cell.get().cloned()
    }
}

static PROCESS_MANAGER: ManagerSlot = ManagerSlot::new();

/// Install `manager` for the whole process
pub fn install(manager: AuthorizationManager) -> Result<Arc<AuthorizationManager>> {
    install_shared(Arc::new(manager))
}

/// Install an already shared manager for the whole process
pub fn install_shared(manager: Arc<AuthorizationManager>) -> Result<Arc<AuthorizationManager>> {
    let manager = PROCESS_MANAGER.install(manager)?;
    info!(services = manager.registry().len(), "authorization manager installed");
    Ok(manager)
}

/// The process-wide manager, if one was installed
pub fn installed() -> Option<Arc<AuthorizationManager>> {
    PROCESS_MANAGER.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_installs_once() {
        let slot = ManagerSlot::new();
        assert!(slot.get().is_none());

        let first = slot.install(Arc::new(AuthorizationManager::new())).unwrap();
        let err = slot.install(Arc::new(AuthorizationManager::new())).unwrap_err();

        assert!(matches!(err, AuthzError::ManagerAlreadyConfigured));
        assert!(Arc::ptr_eq(&first, &slot.get().unwrap()));
    }
}
