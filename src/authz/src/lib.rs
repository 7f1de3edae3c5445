//! # Component Authorization
//!
//! Declarative, policy-based authorization for protected UI components.
//!
//! ## Features
//!
//! - **One service per policy**: conflicting registrations are rejected up front
//! - **OR semantics**: the first requirement whose service grants access wins
//! - **Async-first design** using Tokio, with optional deadlines and cancellation
//! - **Hard misconfiguration errors**: an unregistered policy never reads as "denied"
//! - **Install-once** process-wide manager handle
//!
//! ## Example
//!
//! ```rust
//! use component_authz::{AuthorizationManager, CallerRoleService, Caller, PolicyRequirement};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = AuthorizationManager::builder()
//!         .add_service::<CallerRoleService, _>(|o| o.policy = "Admin".into())
//!         .add_service::<CallerRoleService, _>(|o| o.policy = "Editor".into())
//!         .build()?;
//!
//!     let caller = Caller::new("component:ArticleEditor").with_role("x");
//!     let requirements = vec![PolicyRequirement::with_role_list("Editor", "x")?];
//!
//!     if manager.authorize(&caller, &requirements).await? {
//!         println!("Access granted!");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod guard;
pub mod install;
pub mod manager;
pub mod registry;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use error::{AuthzError, Result};
pub use guard::{GuardOutcome, ProtectedUnit};
pub use manager::{AuthorizationManager, EvaluationMetrics, ManagerBuilder, ManagerConfig, PolicyFile};
pub use registry::{RegisteredService, ServiceKind, ServiceRegistry};
pub use service::{AuthorizationService, CallerRoleService, PolicyBinding, ServiceOptions};
pub use types::{AuthorizationContext, Caller, PolicyName, PolicyRequirement, RoleId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
