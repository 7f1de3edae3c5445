//! Scripted authorization services shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use component_authz::{
    AuthorizationContext, AuthorizationService, AuthzError, PolicyBinding, Result, ServiceOptions,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a scripted service answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Grant,
    Deny,
    /// Grant only when the context requires this role
    GrantIfRequires(&'static str),
    Fail,
}

/// Service with a fixed answer that counts its invocations
#[derive(Debug, Clone)]
pub struct ScriptedService {
    binding: PolicyBinding,
    answer: Answer,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self {
            binding: PolicyBinding::default(),
            answer: Answer::Deny,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ScriptedService {
    pub fn new(policy: &str, answer: Answer) -> Self {
        let mut service = Self {
            answer,
            ..Self::default()
        };
        service.configure(ServiceOptions::new(policy)).unwrap();
        service
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared invocation counter; stays valid after the service is registered
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl AuthorizationService for ScriptedService {
    fn configure(&mut self, options: ServiceOptions) -> Result<()> {
        self.binding.bind(options)
    }

    fn policy(&self) -> Option<&str> {
        self.binding.policy()
    }

    async fn authorize(&self, context: &AuthorizationContext) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.answer {
            Answer::Grant => Ok(true),
            Answer::Deny => Ok(false),
            Answer::GrantIfRequires(role) => Ok(context.requires_role(role)),
            Answer::Fail => Err(AuthzError::service(&context.policy, "backend unavailable")),
        }
    }
}

/// Second service type, for type-tag lookups
#[derive(Debug, Clone, Default)]
pub struct AlwaysGrant {
    binding: PolicyBinding,
}

impl AlwaysGrant {
    pub fn new(policy: &str) -> Self {
        let mut service = Self::default();
        service.configure(ServiceOptions::new(policy)).unwrap();
        service
    }
}

#[async_trait]
impl AuthorizationService for AlwaysGrant {
    fn configure(&mut self, options: ServiceOptions) -> Result<()> {
        self.binding.bind(options)
    }

    fn policy(&self) -> Option<&str> {
        self.binding.policy()
    }

    async fn authorize(&self, _context: &AuthorizationContext) -> Result<bool> {
        Ok(true)
    }
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
