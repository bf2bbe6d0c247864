use std::sync::Arc;

use crate::capability::{boxed_reply_future, CapabilityRegistry, CapabilityResult, FnCapability};

pub const NAME: &str = "repeat";

pub fn register(registry: &mut CapabilityRegistry) {
    registry.register(Arc::new(FnCapability::new(
        NAME,
        ["repeat", "say"],
        Arc::new(|_request, args: Vec<String>| {
            boxed_reply_future(async move {
                if args.is_empty() {
                    return Ok(CapabilityResult::failure("I didn't catch what to repeat."));
                }
                Ok(CapabilityResult::ok(args.join(" ")))
            })
        }),
    )));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandRequest, Origin};
    use crate::routing::{DispatchAudit, Router, RouterOptions};

    #[tokio::test]
    async fn echoes_arguments() {
        let mut registry = CapabilityRegistry::new();
        register(&mut registry);
        let router = Router::new(
            registry,
            Arc::new(DispatchAudit::new()),
            RouterOptions::default(),
        );

        let result = router
            .route(CommandRequest::new("say good morning", Origin::Voice))
            .await;
        assert!(result.success);
        assert_eq!(result.reply_text, "good morning");
    }

    #[tokio::test]
    async fn nothing_to_repeat_is_a_soft_failure() {
        let mut registry = CapabilityRegistry::new();
        register(&mut registry);
        let router = Router::new(
            registry,
            Arc::new(DispatchAudit::new()),
            RouterOptions::default(),
        );

        let result = router
            .route(CommandRequest::new("repeat", Origin::Voice))
            .await;
        assert!(!result.success);
    }
}
