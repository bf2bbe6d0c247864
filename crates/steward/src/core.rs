use std::sync::Arc;

use crate::bus::Bus;
use crate::capability::{CapabilityRegistry, CapabilityResult};
use crate::command::{CommandRequest, Origin};
use crate::error::CoreResult;
use crate::event::{CommandDispatchedPayload, CoreEvent};
use crate::routing::{AuditEntry, DispatchAudit, Router, RouterOptions};

/// Primary facade for the assistant engine.
///
/// Every channel (voice loop, offline relay, HTTP front door, scheduler)
/// funnels into [`Core::submit`]; the registry behind the router is sealed at
/// construction, so a shared `Arc<Core>` is safe across all of them.
pub struct Core {
    router: Router,
    audit: Arc<DispatchAudit>,
    bus: Bus,
}

impl Core {
    /// Validate the registry and seal it behind the router.
    pub fn new(
        registry: CapabilityRegistry,
        audit: Arc<DispatchAudit>,
        options: RouterOptions,
    ) -> CoreResult<Self> {
        registry.validate()?;
        Ok(Self {
            router: Router::new(registry, audit.clone(), options),
            audit,
            bus: Bus::new(64),
        })
    }

    /// Submit a command for dispatch. Always resolves to exactly one reply.
    pub async fn submit(&self, text: &str, origin: Origin) -> CapabilityResult {
        self.submit_request(CommandRequest::new(text, origin)).await
    }

    /// Submit a fully formed request, e.g. one carrying the relay's auth
    /// context.
    pub async fn submit_request(&self, request: CommandRequest) -> CapabilityResult {
        let origin = request.origin;
        let result = self.router.route(request).await;
        let _ = self.bus.publish(CoreEvent::CommandDispatched(CommandDispatchedPayload {
            origin,
            success: result.success,
        }));
        result
    }

    pub fn audit_snapshot(&self) -> Vec<AuditEntry> {
        self.audit.snapshot()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}
