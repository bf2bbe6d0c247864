//! Capabilities: named units of work the router can invoke with residual
//! arguments.

pub mod registry;

pub use registry::{CapabilityBinding, CapabilityRegistry};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::command::CommandRequest;
use crate::error::CoreResult;

/// Why a dispatch produced a failure reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// No binding cleared the match threshold, and the fuzzy pass found
    /// nothing within tolerance.
    Unrecognized,
    /// The capability itself errored or panicked; detail stays in the logs.
    ExecutorFailure,
}

/// The reply produced by one dispatch. Never persisted.
#[derive(Debug, Clone)]
pub struct CapabilityResult {
    pub success: bool,
    pub reply_text: String,
    pub error_kind: Option<FailureKind>,
}

impl CapabilityResult {
    pub fn ok(reply_text: impl Into<String>) -> Self {
        Self {
            success: true,
            reply_text: reply_text.into(),
            error_kind: None,
        }
    }

    pub fn failure(reply_text: impl Into<String>) -> Self {
        Self {
            success: false,
            reply_text: reply_text.into(),
            error_kind: Some(FailureKind::ExecutorFailure),
        }
    }

    pub fn unrecognized(phrase: &str) -> Self {
        Self {
            success: false,
            reply_text: format!("I'm not sure what to do with: {phrase}"),
            error_kind: Some(FailureKind::Unrecognized),
        }
    }
}

/// A named unit of work. `keywords` drive the router's scoring;
/// `unconditional` bindings bypass scoring entirely and are checked first,
/// so always-available commands (stop, restart) cannot be shadowed.
#[async_trait::async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn keywords(&self) -> Vec<String>;

    fn unconditional(&self) -> bool {
        false
    }

    /// Execute with the residual (unmatched) tokens as arguments. Failures
    /// are data: return `Ok(CapabilityResult::failure(..))` for expected
    /// trouble, `Err` for faults — the router converts both into a reply.
    async fn invoke(&self, request: CommandRequest, args: Vec<String>)
        -> CoreResult<CapabilityResult>;
}

pub type CapabilityHandler = Arc<
    dyn Fn(
            CommandRequest,
            Vec<String>,
        ) -> Pin<Box<dyn Future<Output = CoreResult<CapabilityResult>> + Send>>
        + Send
        + Sync,
>;

pub fn boxed_reply_future<F>(
    future: F,
) -> Pin<Box<dyn Future<Output = CoreResult<CapabilityResult>> + Send>>
where
    F: Future<Output = CoreResult<CapabilityResult>> + Send + 'static,
{
    Box::pin(future)
}

/// Closure-backed [`Capability`], the common registration path for leaf
/// handlers that do not need their own type.
pub struct FnCapability {
    name: String,
    keywords: Vec<String>,
    unconditional: bool,
    handler: CapabilityHandler,
}

impl FnCapability {
    pub fn new(
        name: impl Into<String>,
        keywords: impl IntoIterator<Item = impl Into<String>>,
        handler: CapabilityHandler,
    ) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            unconditional: false,
            handler,
        }
    }

    pub fn mark_unconditional(mut self) -> Self {
        self.unconditional = true;
        self
    }
}

#[async_trait::async_trait]
impl Capability for FnCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn keywords(&self) -> Vec<String> {
        self.keywords.clone()
    }

    fn unconditional(&self) -> bool {
        self.unconditional
    }

    async fn invoke(
        &self,
        request: CommandRequest,
        args: Vec<String>,
    ) -> CoreResult<CapabilityResult> {
        (self.handler)(request, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Origin;

    #[tokio::test]
    async fn fn_capability_invokes_handler() {
        let capability = FnCapability::new(
            "echo",
            ["echo"],
            Arc::new(|_request, args: Vec<String>| {
                boxed_reply_future(async move { Ok(CapabilityResult::ok(args.join(" "))) })
            }),
        );

        let result = capability
            .invoke(
                CommandRequest::new("echo hello", Origin::Voice),
                vec!["hello".to_string()],
            )
            .await
            .expect("invoke");
        assert!(result.success);
        assert_eq!(result.reply_text, "hello");
    }

    #[test]
    fn unconditional_builder_flag() {
        let capability = FnCapability::new(
            "stop",
            ["stop"],
            Arc::new(|_, _| boxed_reply_future(async { Ok(CapabilityResult::ok("bye")) })),
        )
        .mark_unconditional();
        assert!(capability.unconditional());
    }
}
