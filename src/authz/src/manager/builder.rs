//! Registration-time builder for [`AuthorizationManager`]

use super::{AuthorizationManager, ManagerConfig, PolicyFile};
use crate::error::{AuthzError, Result};
use crate::registry::RegisteredService;
use crate::service::{AuthorizationService, CallerRoleService, ServiceOptions};
use tracing::debug;

/// Collects configured services and registers them as one batch
///
/// ```rust
/// use component_authz::{AuthorizationManager, CallerRoleService};
///
/// let manager = AuthorizationManager::builder()
///     .add_service::<CallerRoleService, _>(|options| options.policy = "Admin".into())
///     .add_service::<CallerRoleService, _>(|options| options.policy = "Editor".into())
///     .build()
///     .unwrap();
///
/// assert_eq!(manager.get_services().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ManagerBuilder {
    config: ManagerConfig,
    entries: Vec<RegisteredService>,
    error: Option<AuthzError>,
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager configuration
    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Construct an `S`, fill its options through `build` and configure it once
    pub fn add_service<S, F>(self, build: F) -> Self
    where
        S: AuthorizationService + Default,
        F: FnOnce(&mut ServiceOptions),
    {
        let mut options = ServiceOptions::default();
        build(&mut options);
        self.add_service_with(S::default(), options)
    }

    /// Configure `service` with `options`
    pub fn add_service_with<S: AuthorizationService>(self, mut service: S, options: ServiceOptions) -> Self {
        let configured = service.configure(options).map(|()| service);
        self.push(configured.and_then(RegisteredService::new))
    }

    /// Add a service that is already configured
    pub fn add_configured<S: AuthorizationService>(self, service: S) -> Self {
        self.push(RegisteredService::new(service))
    }

    /// Bind every policy of `file` to a [`CallerRoleService`] and adopt its manager settings
    pub fn with_policy_file(self, file: PolicyFile) -> Self {
        let PolicyFile { manager, policies } = file;
        policies
            .into_iter()
            .fold(self.with_config(manager), |builder, options| {
                builder.add_service_with(CallerRoleService::new(), options)
            })
    }

    /// Build the manager, registering every collected service atomically
    pub fn build(self) -> Result<AuthorizationManager> {
        if let Some(e) = self.error {
            return Err(e);
        }

        debug!("Building manager with {} services", self.entries.len());
        let manager = AuthorizationManager::with_config(self.config);
        manager.add_services(self.entries)?;
        Ok(manager)
    }

    fn push(mut self, entry: Result<RegisteredService>) -> Self {
        match entry {
            Ok(entry) => self.entries.push(entry),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Caller, PolicyRequirement};

    #[tokio::test]
    async fn test_builder_registers_services() {
        let manager = ManagerBuilder::new()
            .add_service::<CallerRoleService, _>(|o| o.policy = "Admin".to_string())
            .add_configured(CallerRoleService::for_policy("Editor").unwrap())
            .build()
            .unwrap();

        assert_eq!(manager.registry().policies(), vec!["Admin", "Editor"]);

        let caller = Caller::new("user:ann").with_role("x");
        let requirements = vec![PolicyRequirement::with_role_list("Editor", "x").unwrap()];
        assert!(manager.authorize(&caller, &requirements).await.unwrap());
    }

    #[test]
    fn test_builder_reports_conflicts() {
        let err = ManagerBuilder::new()
            .add_service::<CallerRoleService, _>(|o| o.policy = "P".to_string())
            .add_service::<CallerRoleService, _>(|o| o.policy = "P".to_string())
            .build()
            .unwrap_err();

        assert!(err.is_conflict());
    }

    #[test]
    fn test_builder_reports_first_configuration_error() {
        let err = ManagerBuilder::new()
            .add_service::<CallerRoleService, _>(|_| {})
            .add_configured(CallerRoleService::new())
            .build()
            .unwrap_err();

        assert!(matches!(err, AuthzError::InvalidOptions(_)));
    }

    #[test]
    fn test_reconfiguring_a_service_fails() {
        let service = CallerRoleService::for_policy("Admin").unwrap();
        let err = ManagerBuilder::new()
            .add_service_with(service, ServiceOptions::new("Editor"))
            .build()
            .unwrap_err();

        assert!(matches!(err, AuthzError::AlreadyConfigured(p) if p == "Admin"));
    }
}
