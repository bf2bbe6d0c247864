//! Built-in capabilities.
//!
//! These are the handlers that need nothing beyond the process itself:
//! date/time, echo, dispatch diagnostics, and the always-available stop and
//! restart controls. Device and API integrations register through the same
//! [`crate::capability::CapabilityRegistry`] but live outside this crate.

pub mod controls;
pub mod date_time;
pub mod diagnostics;
pub mod repeat;

use std::sync::Arc;

use crate::capability::CapabilityRegistry;
use crate::routing::DispatchAudit;
use crate::supervisor::ControlHandle;

/// Register every built-in capability. Call during startup, before the
/// registry is sealed into a [`crate::core::Core`].
pub fn register_builtins(
    registry: &mut CapabilityRegistry,
    audit: Arc<DispatchAudit>,
    control: ControlHandle,
) {
    date_time::register(registry);
    repeat::register(registry);
    diagnostics::register(registry, audit);
    controls::register(registry, control);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Origin;
    use crate::core::Core;
    use crate::routing::RouterOptions;
    use crate::supervisor::ControlSignal;
    use tokio::sync::mpsc;

    fn test_core() -> (Core, mpsc::Receiver<ControlSignal>) {
        let (tx, rx) = mpsc::channel(4);
        let audit = Arc::new(DispatchAudit::new());
        let mut registry = CapabilityRegistry::new();
        register_builtins(&mut registry, audit.clone(), ControlHandle::new(tx));
        let core = Core::new(registry, audit, RouterOptions::default()).expect("valid core");
        (core, rx)
    }

    #[tokio::test]
    async fn builtin_registry_validates() {
        let (core, _rx) = test_core();
        assert!(core.router().registry().len() >= 5);
    }

    #[tokio::test]
    async fn time_question_gets_a_time_reply() {
        let (core, _rx) = test_core();
        let result = core.submit("what time is it", Origin::Voice).await;
        assert!(result.success);
        assert!(result.reply_text.contains("It's"));
    }

    #[tokio::test]
    async fn repeat_echoes_residual_tokens() {
        let (core, _rx) = test_core();
        let result = core.submit("repeat hello there", Origin::Voice).await;
        assert!(result.success);
        assert_eq!(result.reply_text, "hello there");
    }

    #[tokio::test]
    async fn goodbye_requests_shutdown() {
        let (core, mut rx) = test_core();
        let result = core.submit("goodbye", Origin::Voice).await;
        assert!(result.success);
        assert!(matches!(rx.recv().await, Some(ControlSignal::Stop)));
    }
}
