//! Protected-unit adapter contract
//!
//! A UI framework adapter runs [`initialize`] before letting a protected
//! unit proceed. The unit supplies its identity and declared requirements;
//! on a grant the success hook runs, on a denial nothing does and the
//! adapter decides what to show.

use crate::error::Result;
use crate::manager::AuthorizationManager;
use crate::types::{Caller, PolicyRequirement};
use async_trait::async_trait;
use tracing::debug;

/// A unit (component, page, view) guarded by policy requirements
#[async_trait]
pub trait ProtectedUnit: Send {
    /// Identity passed to the authorization services
    fn identity(&self) -> Caller;

    /// Requirements declared on the unit's type
    fn requirements(&self) -> Vec<PolicyRequirement>;

    /// Runs after a successful authorization, in place of normal initialization
    async fn on_authorization_success(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Outcome of guarding a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Granted,
    Denied,
}

impl GuardOutcome {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Authorize `unit` and run its success hook when access is granted
pub async fn initialize<U>(manager: &AuthorizationManager, unit: &mut U) -> Result<GuardOutcome>
where
    U: ProtectedUnit + ?Sized,
{
    let caller = unit.identity();
    let requirements = unit.requirements();

    if !manager.authorize(&caller, &requirements).await? {
        debug!(caller = %caller.id, "protected unit denied");
        return Ok(GuardOutcome::Denied);
    }

    unit.on_authorization_success().await?;
    Ok(GuardOutcome::Granted)
}

/// Parse static declarations such as `["Admin", "Editor: writer, reviewer"]`
pub fn declare<I, S>(declarations: I) -> Result<Vec<PolicyRequirement>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    declarations
        .into_iter()
        .map(|d| PolicyRequirement::parse(d.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare() {
        let requirements = declare(["Admin", "Editor: writer, reviewer"]).unwrap();
        assert_eq!(requirements.len(), 2);
        assert!(requirements[1].has_role("reviewer"));

        assert!(declare(["Admin", ""]).is_err());
    }
}
