//! Policy → service registry
//!
//! Owns the mapping from policy names to authorization services. Growth is
//! append-only and happens at configuration time; evaluation only reads.
//! Lookups share a read lock, registration takes the write lock, and once
//! sealed the registry refuses further registrations.

use crate::error::{AuthzError, Result};
use crate::service::AuthorizationService;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Static type tag captured when a service is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceKind {
    id: TypeId,
    name: &'static str,
}

impl ServiceKind {
    /// Tag for service type `S`
    pub fn of<S: 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
        }
    }

    /// Type name of the service implementation
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A configured service ready to be registered
#[derive(Clone)]
pub struct RegisteredService {
    policy: String,
    kind: ServiceKind,
    service: Arc<dyn AuthorizationService>,
    concrete: Arc<dyn Any + Send + Sync>,
}

impl RegisteredService {
    /// Wrap a configured service; fails if it was never bound to a policy
    pub fn new<S: AuthorizationService>(service: S) -> Result<Self> {
        Self::from_arc(Arc::new(service))
    }

    /// Wrap a configured, already shared service
    pub fn from_arc<S: AuthorizationService>(service: Arc<S>) -> Result<Self> {
        let policy = service
            .policy()
            .ok_or(AuthzError::Unconfigured(std::any::type_name::<S>()))?
            .to_string();

        Ok(Self {
            policy,
            kind: ServiceKind::of::<S>(),
            concrete: service.clone(),
            service,
        })
    }

    /// Policy owned by this entry
    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Type tag of the wrapped service
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// The service as a trait object
    pub fn service(&self) -> &Arc<dyn AuthorizationService> {
        &self.service
    }

    /// The service as its concrete type, if it is an `S`
    pub fn downcast<S: AuthorizationService>(&self) -> Option<Arc<S>> {
        self.concrete.clone().downcast::<S>().ok()
    }
}

impl fmt::Debug for RegisteredService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredService")
            .field("policy", &self.policy)
            .field("kind", &self.kind.name)
            .finish()
    }
}

#[derive(Default)]
struct RegistryInner {
    /// Registration order
    entries: Vec<RegisteredService>,
    /// Policy name → index into `entries`
    by_policy: HashMap<String, usize>,
}

/// Registry of authorization services keyed by policy name
#[derive(Default)]
pub struct ServiceRegistry {
    inner: RwLock<RegistryInner>,
    sealed: AtomicBool,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single entry
    pub fn register(&self, entry: RegisteredService) -> Result<()> {
        self.register_many(vec![entry])
    }

    /// Wrap and register a configured service
    pub fn register_service<S: AuthorizationService>(&self, service: S) -> Result<()> {
        self.register(RegisteredService::new(service)?)
    }

    /// Register a batch atomically
    ///
    /// Every incoming policy is checked against the existing entries and
    /// against the rest of the batch. On any conflict nothing is added and
    /// the error names every offending policy.
    pub fn register_many(&self, entries: Vec<RegisteredService>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write();

        if self.is_sealed() {
            let policy = entries[0].policy.clone();
            warn!(policy = %policy, "registration rejected, registry is sealed");
            return Err(AuthzError::RegistrySealed(policy));
        }

        let conflicts: Vec<String> = {
            let mut incoming: HashSet<&str> = HashSet::with_capacity(entries.len());
            entries
                .iter()
                .filter(|entry| {
                    let owned = inner.by_policy.contains_key(&entry.policy);
                    !incoming.insert(entry.policy.as_str()) || owned
                })
                .map(|entry| entry.policy.clone())
                .collect()
        };

        if !conflicts.is_empty() {
            let err = AuthzError::conflict(conflicts);
            warn!("{}", err);
            return Err(err);
        }

        for entry in entries {
            info!(policy = %entry.policy, kind = entry.kind.name, "registered authorization service");
            let index = inner.entries.len();
            inner.by_policy.insert(entry.policy.clone(), index);
            inner.entries.push(entry);
        }

        Ok(())
    }

    /// Refuse any further registration
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            info!(services = self.len(), "service registry sealed");
        }
    }

    /// Whether the registry refuses registration
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Service owning `policy` (exact, case-sensitive match)
    pub fn get(&self, policy: &str) -> Option<Arc<dyn AuthorizationService>> {
        let inner = self.inner.read();
        inner
            .by_policy
            .get(policy)
            .map(|&index| inner.entries[index].service.clone())
    }

    /// Whether a service owns `policy`
    pub fn contains(&self, policy: &str) -> bool {
        self.inner.read().by_policy.contains_key(policy)
    }

    /// First service registered with type tag `kind`
    pub fn get_by_kind(&self, kind: ServiceKind) -> Option<Arc<dyn AuthorizationService>> {
        self.inner
            .read()
            .entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.service.clone())
    }

    /// All services registered with type tag `kind`, in registration order
    pub fn all_by_kind(&self, kind: ServiceKind) -> Vec<Arc<dyn AuthorizationService>> {
        self.inner
            .read()
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.service.clone())
            .collect()
    }

    /// First service of concrete type `S`
    pub fn get_of<S: AuthorizationService>(&self) -> Option<Arc<S>> {
        self.inner.read().entries.iter().find_map(|e| e.downcast::<S>())
    }

    /// All services of concrete type `S`, in registration order
    pub fn all_of<S: AuthorizationService>(&self) -> Vec<Arc<S>> {
        self.inner
            .read()
            .entries
            .iter()
            .filter_map(|e| e.downcast::<S>())
            .collect()
    }

    /// Every service, in registration order
    pub fn all(&self) -> Vec<Arc<dyn AuthorizationService>> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|e| e.service.clone())
            .collect()
    }

    /// Every entry, in registration order
    pub fn entries(&self) -> Vec<RegisteredService> {
        self.inner.read().entries.clone()
    }

    /// Registered policy names, in registration order
    pub fn policies(&self) -> Vec<String> {
        self.inner
            .read()
            .entries
            .iter()
            .map(|e| e.policy.clone())
            .collect()
    }

    /// Number of registered services
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("policies", &self.policies())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
