//! Process-wide installation
//!
//! Kept in its own test binary: installation is once per process.

use component_authz::{install, AuthorizationManager, AuthzError, CallerRoleService};
use std::sync::Arc;

#[test]
fn test_install_once_per_process() {
    assert!(install::installed().is_none());

    let manager = AuthorizationManager::builder()
        .add_service::<CallerRoleService, _>(|o| o.policy = "Admin".into())
        .build()
        .unwrap();
    let installed = install::install(manager).unwrap();

    let err = install::install(AuthorizationManager::new()).unwrap_err();
    assert!(matches!(err, AuthzError::ManagerAlreadyConfigured));
    assert!(err.is_configuration_error());

    let handle = install::installed().unwrap();
    assert!(Arc::ptr_eq(&handle, &installed));
    assert!(handle.get_service("Admin").is_some());
}
