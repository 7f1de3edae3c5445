//! Authorization service contract
//!
//! An [`AuthorizationService`] decides access for exactly one policy. The
//! policy is bound once, through [`AuthorizationService::configure`], before
//! the service is handed to the registry. After that the service is shared
//! behind an `Arc` and may be invoked by many evaluations at once, so
//! `authorize` must not mutate shared state.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use component_authz::{
//!     AuthorizationContext, AuthorizationService, PolicyBinding, Result, ServiceOptions,
//! };
//!
//! #[derive(Default)]
//! struct OfficeHours {
//!     binding: PolicyBinding,
//! }
//!
//! #[async_trait]
//! impl AuthorizationService for OfficeHours {
//!     fn configure(&mut self, options: ServiceOptions) -> Result<()> {
//!         self.binding.bind(options)
//!     }
//!
//!     fn policy(&self) -> Option<&str> {
//!         self.binding.policy()
//!     }
//!
//!     async fn authorize(&self, context: &AuthorizationContext) -> Result<bool> {
//!         Ok(context.caller.attributes.get("shift").is_some())
//!     }
//! }
//! ```

use crate::error::{AuthzError, Result};
use crate::types::{AuthorizationContext, Caller, PolicyRequirement};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Options used to configure an authorization service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOptions {
    /// Policy the configured instance will own
    pub policy: String,
}

impl ServiceOptions {
    /// Options for `policy`
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
        }
    }

    /// Reject blank policy names
    pub fn validate(&self) -> Result<()> {
        if self.policy.trim().is_empty() {
            return Err(AuthzError::InvalidOptions(
                "policy name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Set-once policy slot for service implementations
#[derive(Debug, Clone, Default)]
pub struct PolicyBinding {
    policy: Option<String>,
}

impl PolicyBinding {
    /// Bind to the trimmed policy named in `options`; a second call fails
    pub fn bind(&mut self, options: ServiceOptions) -> Result<()> {
        options.validate()?;
        if let Some(existing) = &self.policy {
            return Err(AuthzError::AlreadyConfigured(existing.clone()));
        }
        self.policy = Some(options.policy.trim().to_string());
        Ok(())
    }

    /// Bound policy, if any
    pub fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    /// Whether `bind` succeeded
    pub fn is_bound(&self) -> bool {
        self.policy.is_some()
    }
}

/// Evaluates authorization for a single policy
#[async_trait]
pub trait AuthorizationService: Send + Sync + 'static {
    /// Bind this instance to a policy. Called exactly once, before registration.
    fn configure(&mut self, options: ServiceOptions) -> Result<()>;

    /// Policy this instance owns, `None` until configured
    fn policy(&self) -> Option<&str>;

    /// Decide access for `context`
    ///
    /// Errors are service faults and propagate to the caller of the manager;
    /// they are never read as a denial.
    async fn authorize(&self, context: &AuthorizationContext) -> Result<bool>;

    /// Build a context from this service's own policy and the requirement's
    /// roles, then delegate to [`AuthorizationService::authorize`]
    async fn evaluate_for_requirement(
        &self,
        caller: &Caller,
        requirement: &PolicyRequirement,
    ) -> Result<bool> {
        let policy = self
            .policy()
            .ok_or(AuthzError::Unconfigured(std::any::type_name::<Self>()))?;

        let context = AuthorizationContext::for_requirement(policy, requirement, caller);
        debug!(policy, context_id = %context.id, caller = %caller.id, "evaluating requirement");
        self.authorize(&context).await
    }
}

/// Grants access when the requirement lists no roles, or when the caller
/// holds at least one of them
#[derive(Debug, Clone, Default)]
pub struct CallerRoleService {
    binding: PolicyBinding,
}

impl CallerRoleService {
    /// Unconfigured instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Instance already bound to `policy`
    pub fn for_policy(policy: impl Into<String>) -> Result<Self> {
        let mut service = Self::new();
        service.configure(ServiceOptions::new(policy))?;
        Ok(service)
    }
}

#[async_trait]
impl AuthorizationService for CallerRoleService {
    fn configure(&mut self, options: ServiceOptions) -> Result<()> {
        self.binding.bind(options)
    }

    fn policy(&self) -> Option<&str> {
        self.binding.policy()
    }

    async fn authorize(&self, context: &AuthorizationContext) -> Result<bool> {
        if context.roles.is_empty() {
            return Ok(true);
        }
        Ok(context.roles.iter().any(|role| context.caller.has_role(role)))
    }
}
