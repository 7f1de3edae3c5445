//! Error types for component authorization

use thiserror::Error;

/// Authorization errors
///
/// Only a plain `false` from [`crate::AuthorizationManager::authorize`] means
/// "access denied". Every variant here is a programmer or operator error and
/// should reach whoever wired the application up.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// One or more services collide with an already registered policy name,
    /// or with each other inside the same batch
    #[error("One or more conflicting policies registered: {}", .policies.join(", "))]
    Conflict { policies: Vec<String> },

    /// A requirement names a policy that has no registered service
    #[error("no authorization service registered for policy `{0}`")]
    MissingService(String),

    /// The process-wide manager was installed twice
    #[error("an authorization manager is already installed for this process")]
    ManagerAlreadyConfigured,

    /// A service was configured a second time
    #[error("authorization service already bound to policy `{0}`")]
    AlreadyConfigured(String),

    /// A service was registered before it was bound to a policy
    #[error("authorization service `{0}` has not been configured with a policy")]
    Unconfigured(&'static str),

    /// Invalid requirement declaration
    #[error("Invalid requirement: {0}")]
    InvalidRequirement(String),

    /// Invalid service options
    #[error("Invalid service options: {0}")]
    InvalidOptions(String),

    /// Registration attempted after evaluation started
    #[error("registry is sealed, cannot register policy `{0}`")]
    RegistrySealed(String),

    /// Fault raised inside a service's own authorization logic
    #[error("authorization service for policy `{policy}` failed: {message}")]
    Service { policy: String, message: String },

    /// Invalid configuration file contents
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Metrics registration or export failure
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl AuthzError {
    /// Build a service-level fault for `policy`
    pub fn service(policy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            policy: policy.into(),
            message: message.into(),
        }
    }

    /// Build a conflict error; names are sorted and de-duplicated
    pub fn conflict<I, S>(policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut policies: Vec<String> = policies.into_iter().map(Into::into).collect();
        policies.sort();
        policies.dedup();
        Self::Conflict { policies }
    }

    /// True for errors caused by wiring rather than by a service at runtime
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingService(_)
                | Self::Unconfigured(_)
                | Self::AlreadyConfigured(_)
                | Self::RegistrySealed(_)
                | Self::ManagerAlreadyConfigured
                | Self::Config(_)
        )
    }

    /// True for registration conflicts
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
