//! Authorization manager
//!
//! Facade the UI adapter calls. Resolves each declared requirement to the
//! service owning its policy and combines the answers with OR semantics:
//! the first service that grants access wins.
//!
//! # Evaluation
//!
//! ```text
//! requirements ── empty? ──────────────────────────────► granted
//!      │
//!      ▼
//! resolve every policy ── missing? ──► MissingService error
//!      │
//!      ▼
//! for each requirement, in declaration order:
//!     service.authorize(context) ── true ──► granted (rest skipped)
//!            │ false / deadline elapsed
//!            ▼
//!          next
//!      │
//!      ▼
//!   denied
//! ```
//!
//! Every policy is resolved before any service runs, so a misconfigured
//! requirement fails the call whatever the services would have answered.

pub mod builder;
pub mod config;
pub mod metrics;

pub use builder::ManagerBuilder;
pub use config::{ManagerConfig, PolicyFile, EVAL_TIMEOUT_ENV};
pub use metrics::{EvaluationMetrics, ManagerMetrics};

use crate::error::{AuthzError, Result};
use crate::registry::{RegisteredService, ServiceKind, ServiceRegistry};
use crate::service::AuthorizationService;
use crate::types::{AuthorizationContext, Caller, PolicyRequirement};

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of one service invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Invocation {
    Granted,
    Denied,
    TimedOut,
    Cancelled,
}

impl From<bool> for Invocation {
    fn from(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Orchestrates policy evaluation over a [`ServiceRegistry`]
///
/// Stateless across calls apart from the registry, so one instance can be
/// shared by every adapter call site.
pub struct AuthorizationManager {
    registry: ServiceRegistry,
    config: ManagerConfig,
    metrics: Option<Arc<ManagerMetrics>>,
}

impl AuthorizationManager {
    /// Manager with default configuration and no services
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    /// Manager with `config` and no services
    pub fn with_config(config: ManagerConfig) -> Self {
        let metrics = if config.enable_metrics {
            match ManagerMetrics::new() {
                Ok(metrics) => Some(Arc::new(metrics)),
                Err(e) => {
                    warn!("metrics disabled, collector setup failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        info!(
            "AuthorizationManager initialized with timeout={:?}, seal={}, metrics={}",
            config.evaluation_timeout, config.seal_on_first_evaluation, config.enable_metrics
        );

        Self {
            registry: ServiceRegistry::new(),
            config,
            metrics,
        }
    }

    /// Registration-time builder
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Register a configured service
    pub fn add_service<S: AuthorizationService>(&self, service: S) -> Result<()> {
        self.registry.register_service(service)
    }

    /// Register a wrapped service
    pub fn add_entry(&self, entry: RegisteredService) -> Result<()> {
        self.registry.register(entry)
    }

    /// Register a batch atomically
    pub fn add_services(&self, entries: Vec<RegisteredService>) -> Result<()> {
        self.registry.register_many(entries)
    }

    /// Decide whether `caller` may proceed given its declared requirements
    ///
    /// * no requirements → `Ok(true)`
    /// * a requirement naming an unregistered policy → [`AuthzError::MissingService`]
    /// * otherwise `Ok(true)` as soon as one service grants, `Ok(false)` if none does
    ///
    /// Service faults propagate as errors and stop the evaluation.
    pub async fn authorize(
        &self,
        caller: &Caller,
        requirements: &[PolicyRequirement],
    ) -> Result<bool> {
        self.evaluate(caller, requirements, None).await
    }

    /// [`authorize`](Self::authorize) that gives up when `cancel` fires
    ///
    /// A cancelled service call counts as a failed requirement; the walk then
    /// ends with `Ok(false)` since every later call would be cancelled too.
    pub async fn authorize_with_cancel(
        &self,
        caller: &Caller,
        requirements: &[PolicyRequirement],
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.evaluate(caller, requirements, Some(cancel)).await
    }

    /// Service owning `policy`
    pub fn get_service(&self, policy: &str) -> Option<Arc<dyn AuthorizationService>> {
        self.registry.get(policy)
    }

    /// First service registered with type tag `kind`
    pub fn get_service_by_kind(&self, kind: ServiceKind) -> Option<Arc<dyn AuthorizationService>> {
        self.registry.get_by_kind(kind)
    }

    /// All services registered with type tag `kind`
    pub fn get_services_by_kind(&self, kind: ServiceKind) -> Vec<Arc<dyn AuthorizationService>> {
        self.registry.all_by_kind(kind)
    }

    /// First service of concrete type `S`
    pub fn get_service_of<S: AuthorizationService>(&self) -> Option<Arc<S>> {
        self.registry.get_of::<S>()
    }

    /// All services of concrete type `S`
    pub fn get_services_of<S: AuthorizationService>(&self) -> Vec<Arc<S>> {
        self.registry.all_of::<S>()
    }

    /// Every registered service, in registration order
    pub fn get_services(&self) -> Vec<Arc<dyn AuthorizationService>> {
        self.registry.all()
    }

    /// Underlying registry
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Metrics snapshot, if metrics are enabled
    pub fn metrics(&self) -> Option<EvaluationMetrics> {
        self.metrics.as_ref().map(|metrics| metrics.snapshot())
    }

    /// Metrics in Prometheus text format, `None` when metrics are disabled
    pub fn export_metrics(&self) -> Result<Option<String>> {
        self.metrics
            .as_ref()
            .map(|metrics| metrics.export_prometheus())
            .transpose()
    }

    async fn evaluate(
        &self,
        caller: &Caller,
        requirements: &[PolicyRequirement],
        cancel: Option<&CancellationToken>,
    ) -> Result<bool> {
        let start = Instant::now();

        if self.config.seal_on_first_evaluation {
            self.registry.seal();
        }

        debug!(
            "Authorization request: caller={}, requirements={}",
            caller.id,
            requirements.len()
        );

        if requirements.is_empty() {
            debug!("No requirements declared, access granted");
            if let Some(metrics) = &self.metrics {
                metrics.record_unrestricted();
                metrics.record_latency(start.elapsed());
            }
            return Ok(true);
        }

        let resolved = match self.resolve(requirements) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(caller = %caller.id, "{}", e);
                if let Some(metrics) = &self.metrics {
                    metrics.record_configuration_error();
                }
                return Err(e);
            }
        };

        for (index, (requirement, service)) in resolved.iter().enumerate() {
            let context = AuthorizationContext::for_requirement(requirement.policy(), requirement, caller);

            debug!(
                "Evaluating requirement {}/{}: policy={}, roles=[{}], context={}",
                index + 1,
                resolved.len(),
                requirement.policy(),
                requirement.roles_display(),
                context.id
            );

            let outcome = match self.invoke(service.as_ref(), &context, cancel).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(policy = requirement.policy(), caller = %caller.id, "service failed: {}", e);
                    if let Some(metrics) = &self.metrics {
                        metrics.record_service_error();
                    }
                    return Err(e);
                }
            };

            match outcome {
                Invocation::Granted => {
                    info!(
                        "Decision: ALLOW for '{}' by policy '{}'",
                        caller.id,
                        requirement.policy()
                    );
                    if let Some(metrics) = &self.metrics {
                        if index + 1 < resolved.len() {
                            metrics.record_short_circuit();
                        }
                    }
                    return Ok(self.finalize(true, start));
                }
                Invocation::Denied => {
                    debug!("Policy '{}' denied, trying next requirement", requirement.policy());
                }
                Invocation::TimedOut => {
                    warn!(
                        policy = requirement.policy(),
                        caller = %caller.id,
                        "service exceeded {:?}, treating requirement as failed",
                        self.config.evaluation_timeout
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_timeout();
                    }
                }
                Invocation::Cancelled => {
                    warn!(
                        policy = requirement.policy(),
                        caller = %caller.id,
                        "evaluation cancelled, access denied"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_cancellation();
                    }
                    return Ok(self.finalize(false, start));
                }
            }
        }

        info!("Decision: DENY for '{}', no requirement satisfied", caller.id);
        Ok(self.finalize(false, start))
    }

    fn resolve<'r>(
        &self,
        requirements: &'r [PolicyRequirement],
    ) -> Result<Vec<(&'r PolicyRequirement, Arc<dyn AuthorizationService>)>> {
        requirements
            .iter()
            .map(|requirement| {
                self.registry
                    .get(requirement.policy())
                    .map(|service| (requirement, service))
                    .ok_or_else(|| AuthzError::MissingService(requirement.policy().to_string()))
            })
            .collect()
    }

    async fn invoke(
        &self,
        service: &dyn AuthorizationService,
        context: &AuthorizationContext,
        cancel: Option<&CancellationToken>,
    ) -> Result<Invocation> {
        let call = async {
            match self.config.evaluation_timeout {
                Some(limit) => match tokio::time::timeout(limit, service.authorize(context)).await {
                    Ok(result) => result.map(Invocation::from),
                    Err(_) => Ok(Invocation::TimedOut),
                },
                None => service.authorize(context).await.map(Invocation::from),
            }
        };

        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Ok(Invocation::Cancelled),
                result = call => result,
            },
            None => call.await,
        }
    }

    fn finalize(&self, granted: bool, start: Instant) -> bool {
        if let Some(metrics) = &self.metrics {
            metrics.record_decision(granted);
            metrics.record_latency(start.elapsed());
        }
        granted
    }
}

impl Default for AuthorizationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuthorizationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationManager")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}
