//! Core authorization types

use crate::error::{AuthzError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Policy name
pub type PolicyName = String;

/// Role identifier
pub type RoleId = String;

/// A policy requirement declared on a protected unit
///
/// Immutable once constructed. Roles keep declaration order; membership
/// checks go through [`PolicyRequirement::has_role`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PolicyRequirement {
    policy: PolicyName,
    roles: Vec<RoleId>,
}

impl PolicyRequirement {
    /// Requirement with no role restriction
    pub fn new(policy: impl Into<String>) -> Result<Self> {
        Self::with_roles(policy, std::iter::empty::<String>())
    }

    /// Requirement with a comma-separated role list (e.g. `"admin, editor"`)
    pub fn with_role_list(policy: impl Into<String>, roles: &str) -> Result<Self> {
        Self::with_roles(policy, split_roles(roles))
    }

    /// Requirement with explicit roles; the policy and each role are trimmed,
    /// blank roles are dropped
    pub fn with_roles<I, S>(policy: impl Into<String>, roles: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let policy = policy.into().trim().to_string();
        if policy.is_empty() {
            return Err(AuthzError::InvalidRequirement(
                "policy name cannot be empty".to_string(),
            ));
        }

        let roles = roles
            .into_iter()
            .flat_map(|r| split_roles(r.as_ref()).collect::<Vec<_>>())
            .collect();

        Ok(Self { policy, roles })
    }

    /// Parse a declaration of the form `Policy` or `Policy:role, role`
    pub fn parse(declaration: &str) -> Result<Self> {
        match declaration.split_once(':') {
            Some((policy, roles)) => Self::with_role_list(policy.trim(), roles),
            None => Self::new(declaration.trim()),
        }
    }

    /// Policy name
    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Roles in declaration order
    pub fn roles(&self) -> &[RoleId] {
        &self.roles
    }

    /// Set-semantic role membership
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Roles joined with `", "`
    pub fn roles_display(&self) -> String {
        self.roles.join(", ")
    }
}

impl fmt::Display for PolicyRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.roles.is_empty() {
            write!(f, "{}", self.policy)
        } else {
            write!(f, "{}:{}", self.policy, self.roles.join(","))
        }
    }
}

impl FromStr for PolicyRequirement {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PolicyRequirement {
    type Error = AuthzError;

    fn try_from(declaration: String) -> Result<Self> {
        Self::parse(&declaration)
    }
}

impl From<PolicyRequirement> for String {
    fn from(requirement: PolicyRequirement) -> Self {
        requirement.to_string()
    }
}

fn split_roles(roles: &str) -> impl Iterator<Item = String> + '_ {
    roles
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

/// Identity of the protected unit (or principal) asking for access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Caller identifier (e.g., "component:AdminPanel", "user:alice@example.com")
    pub id: String,

    /// Caller kind, taken from the identifier prefix
    #[serde(rename = "type")]
    pub kind: String,

    /// Roles held by the caller
    #[serde(default)]
    pub roles: Vec<RoleId>,

    /// Additional attributes
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Caller {
    /// Create a caller from an ID string
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let kind = match id.split_once(':') {
            Some((kind, _)) => kind.to_string(),
            None => "component".to_string(),
        };

        Self {
            id,
            kind,
            roles: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Add a role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Add several roles
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the caller holds `role`
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Request-scoped context handed to an authorization service
///
/// Created fresh for every service invocation. `id` and `created_at` exist
/// for auditing and never take part in a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationContext {
    /// Correlation identifier
    pub id: Uuid,

    /// Policy being evaluated
    pub policy: PolicyName,

    /// Roles copied from the triggering requirement
    pub roles: Vec<RoleId>,

    /// Who is asking
    pub caller: Caller,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl AuthorizationContext {
    /// Create a context for `policy` with the requirement's roles
    pub fn new(policy: impl Into<String>, roles: Vec<RoleId>, caller: Caller) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy: policy.into(),
            roles,
            caller,
            created_at: Utc::now(),
        }
    }

    /// Context for a requirement evaluated under `policy`
    pub fn for_requirement(policy: &str, requirement: &PolicyRequirement, caller: &Caller) -> Self {
        Self::new(policy, requirement.roles().to_vec(), caller.clone())
    }

    /// Set-semantic role membership on the required roles
    pub fn requires_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
