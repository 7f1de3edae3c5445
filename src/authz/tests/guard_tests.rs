//! Protected-unit lifecycle tests

mod common;

use async_trait::async_trait;
use common::{Answer, ScriptedService};
use component_authz::guard::{self, GuardOutcome, ProtectedUnit};
use component_authz::{AuthorizationManager, AuthzError, Caller, PolicyRequirement, Result};

struct AdminPanel {
    declarations: &'static [&'static str],
    initialized: bool,
}

impl AdminPanel {
    fn new(declarations: &'static [&'static str]) -> Self {
        Self {
            declarations,
            initialized: false,
        }
    }
}

#[async_trait]
impl ProtectedUnit for AdminPanel {
    fn identity(&self) -> Caller {
        Caller::new("component:AdminPanel")
    }

    fn requirements(&self) -> Vec<PolicyRequirement> {
        guard::declare(self.declarations).unwrap()
    }

    async fn on_authorization_success(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }
}

fn manager() -> AuthorizationManager {
    let manager = AuthorizationManager::new();
    manager.add_service(ScriptedService::new("Admin", Answer::Deny)).unwrap();
    manager
        .add_service(ScriptedService::new("Editor", Answer::GrantIfRequires("x")))
        .unwrap();
    manager
}

#[tokio::test]
async fn test_granted_unit_runs_success_hook() {
    let manager = manager();
    let mut panel = AdminPanel::new(&["Admin", "Editor: x"]);

    let outcome = guard::initialize(&manager, &mut panel).await.unwrap();

    assert_eq!(outcome, GuardOutcome::Granted);
    assert!(panel.initialized);
}

#[tokio::test]
async fn test_denied_unit_skips_success_hook() {
    let manager = manager();
    let mut panel = AdminPanel::new(&["Admin", "Editor: y"]);

    let outcome = guard::initialize(&manager, &mut panel).await.unwrap();

    assert!(!outcome.is_granted());
    assert!(!panel.initialized);
}

#[tokio::test]
async fn test_undeclared_unit_is_unrestricted() {
    let manager = manager();
    let mut panel = AdminPanel::new(&[]);

    assert!(guard::initialize(&manager, &mut panel).await.unwrap().is_granted());
    assert!(panel.initialized);
}

#[tokio::test]
async fn test_misconfigured_unit_surfaces_error() {
    let manager = manager();
    let mut panel = AdminPanel::new(&["Reports"]);

    let err = guard::initialize(&manager, &mut panel).await.unwrap_err();

    assert!(matches!(err, AuthzError::MissingService(p) if p == "Reports"));
    assert!(!panel.initialized);
}

#[tokio::test]
async fn test_guard_accepts_trait_objects() {
    let manager = manager();
    let mut units: Vec<Box<dyn ProtectedUnit>> = vec![
        Box::new(AdminPanel::new(&["Editor:x"])),
        Box::new(AdminPanel::new(&["Admin"])),
    ];

    let mut outcomes = Vec::new();
    for unit in units.iter_mut() {
        outcomes.push(guard::initialize(&manager, unit.as_mut()).await.unwrap());
    }

    assert_eq!(outcomes, vec![GuardOutcome::Granted, GuardOutcome::Denied]);
}
