//! Manager configuration and policy files

use crate::error::{AuthzError, Result};
use crate::service::ServiceOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`ManagerConfig::evaluation_timeout`]
pub const EVAL_TIMEOUT_ENV: &str = "AUTHZ_EVAL_TIMEOUT_MS";

/// Authorization manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Upper bound on each service call; an elapsed deadline counts as a
    /// denial for that requirement. `0` in a file or the environment means
    /// no deadline.
    #[serde(rename = "evaluation_timeout_ms", with = "duration_ms")]
    pub evaluation_timeout: Option<Duration>,

    /// Seal the registry on the first evaluation
    pub seal_on_first_evaluation: bool,

    /// Collect evaluation metrics
    pub enable_metrics: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            evaluation_timeout: None,
            seal_on_first_evaluation: true,
            enable_metrics: true,
        }
    }
}

impl ManagerConfig {
    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(std::env::var(EVAL_TIMEOUT_ENV).ok().as_deref())
    }

    fn with_overrides(mut self, timeout_ms: Option<&str>) -> Result<Self> {
        if let Some(raw) = timeout_ms {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                AuthzError::Config(format!("{EVAL_TIMEOUT_ENV} must be milliseconds, got `{raw}`"))
            })?;
            self.evaluation_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        Ok(self)
    }
}

/// Policy file: manager settings plus the policies to bind
///
/// ```json
/// {
///   "manager": { "evaluation_timeout_ms": 250 },
///   "policies": [ { "policy": "Admin" }, { "policy": "Editor" } ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub manager: ManagerConfig,

    #[serde(default)]
    pub policies: Vec<ServiceOptions>,
}

impl PolicyFile {
    /// Read and validate a policy file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Parse and validate policy file contents
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(raw)?;
        for options in &file.policies {
            options
                .validate()
                .map_err(|e| AuthzError::Config(e.to_string()))?;
        }
        Ok(file)
    }
}

mod duration_ms {
    use serde::{ser, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => {
                let ms = u64::try_from(d.as_millis()).map_err(ser::Error::custom)?;
                serializer.serialize_some(&ms)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert!(config.evaluation_timeout.is_none());
        assert!(config.seal_on_first_evaluation);
        assert!(config.enable_metrics);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ManagerConfig = serde_json::from_str(r#"{"evaluation_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.evaluation_timeout, Some(Duration::from_millis(250)));
        assert!(config.seal_on_first_evaluation);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["evaluation_timeout_ms"], 250);
    }

    #[test]
    fn test_zero_timeout_means_no_deadline_everywhere() {
        let from_file: ManagerConfig = serde_json::from_str(r#"{"evaluation_timeout_ms": 0}"#).unwrap();
        let from_env = ManagerConfig::default().with_overrides(Some("0")).unwrap();

        assert_eq!(from_file.evaluation_timeout, None);
        assert_eq!(from_file.evaluation_timeout, from_env.evaluation_timeout);
    }

    #[test]
    fn test_oversized_timeout_fails_to_serialize() {
        let config = ManagerConfig {
            evaluation_timeout: Some(Duration::MAX),
            ..Default::default()
        };
        assert!(serde_json::to_string(&config).is_err());
    }

    #[test]
    fn test_timeout_override() {
        let config = ManagerConfig::default().with_overrides(Some("40")).unwrap();
        assert_eq!(config.evaluation_timeout, Some(Duration::from_millis(40)));

        let disabled = config.clone().with_overrides(Some("0")).unwrap();
        assert!(disabled.evaluation_timeout.is_none());

        assert!(matches!(
            ManagerConfig::default().with_overrides(Some("soon")),
            Err(AuthzError::Config(_))
        ));
    }

    #[test]
    fn test_policy_file_rejects_blank_policy() {
        let err = PolicyFile::from_json(r#"{"policies": [{"policy": ""}]}"#).unwrap_err();
        assert!(matches!(err, AuthzError::Config(_)));
    }
}
