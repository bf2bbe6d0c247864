use std::sync::Arc;

use crate::capability::{CapabilityBinding, CapabilityRegistry, CapabilityResult};
use crate::command::parser::{self, ParsedPhrase};
use crate::command::CommandRequest;
use crate::config::RoutingConfig;
use crate::routing::audit::{DispatchAudit, UNRECOGNIZED};
use crate::routing::fuzzy;

/// Tunable matching parameters. The threshold is the minimum number of
/// matched keywords a binding needs; the tolerance bounds the fuzzy pass.
#[derive(Debug, Clone, Copy)]
pub struct RouterOptions {
    pub match_threshold: usize,
    pub fuzzy_tolerance: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            match_threshold: 1,
            fuzzy_tolerance: 2,
        }
    }
}

impl From<&RoutingConfig> for RouterOptions {
    fn from(config: &RoutingConfig) -> Self {
        Self {
            match_threshold: config.match_threshold.max(1),
            fuzzy_tolerance: config.fuzzy_tolerance,
        }
    }
}

/// Routes free-text commands to capabilities.
///
/// Matching order: unconditional bindings short-circuit everything, then
/// keyword scoring (ties prefer the smaller keyword set), then a compound
/// " and " split, then the fuzzy closest-match pass. Whatever happens, the
/// caller gets exactly one [`CapabilityResult`] back — capability faults are
/// converted at this boundary, never propagated.
pub struct Router {
    registry: CapabilityRegistry,
    audit: Arc<DispatchAudit>,
    options: RouterOptions,
}

impl Router {
    pub fn new(registry: CapabilityRegistry, audit: Arc<DispatchAudit>, options: RouterOptions) -> Self {
        Self {
            registry,
            audit,
            options,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub async fn route(&self, request: CommandRequest) -> CapabilityResult {
        // Compound phrases become sequential commands, unless a phrase
        // keyword spanning the connector claims the whole input.
        if !self.split_exempt(&request.text) {
            if let Some(parts) = parser::split_compound(&request.text) {
                let mut results = Vec::with_capacity(parts.len());
                for part in parts {
                    let sub = request.sub_request(&part);
                    let result = match self.try_route(&sub).await {
                        Some(result) => result,
                        None => self.fuzzy_route(&sub).await,
                    };
                    results.push(result);
                }
                return combine(results);
            }
        }

        match self.try_route(&request).await {
            Some(result) => result,
            None => self.fuzzy_route(&request).await,
        }
    }

    fn split_exempt(&self, text: &str) -> bool {
        let normalized = parser::parse(text).normalized_text();
        self.registry.bindings().iter().any(|binding| {
            binding
                .keywords
                .iter()
                .any(|keyword| keyword.contains(" and ") && normalized.contains(keyword.as_str()))
        })
    }

    /// Unconditional check plus keyword scoring. `None` means no binding
    /// cleared the threshold.
    async fn try_route(&self, request: &CommandRequest) -> Option<CapabilityResult> {
        let parsed = parser::parse(&request.text);
        if parsed.tokens.is_empty() {
            return None;
        }

        for binding in self.registry.bindings().iter().filter(|b| b.unconditional) {
            let matched = matched_keywords(binding, &parsed);
            if !matched.is_empty() {
                let args = residual_args(&parsed, &matched);
                return Some(self.dispatch(binding, args, request).await);
            }
        }

        let mut best: Option<(&CapabilityBinding, Vec<String>)> = None;
        for binding in self.registry.bindings().iter().filter(|b| !b.unconditional) {
            let matched = matched_keywords(binding, &parsed);
            if matched.is_empty() {
                continue;
            }
            let better = match &best {
                None => true,
                Some((current, current_matched)) => {
                    matched.len() > current_matched.len()
                        || (matched.len() == current_matched.len()
                            && binding.keywords.len() < current.keywords.len())
                }
            };
            if better {
                best = Some((binding, matched));
            }
        }

        match best {
            Some((binding, matched)) if matched.len() >= self.options.match_threshold => {
                let args = residual_args(&parsed, &matched);
                Some(self.dispatch(binding, args, request).await)
            }
            _ => None,
        }
    }

    async fn fuzzy_route(&self, request: &CommandRequest) -> CapabilityResult {
        let parsed = parser::parse(&request.text);
        if let Some(found) = fuzzy::closest_binding(
            &parsed,
            self.registry.bindings(),
            self.options.fuzzy_tolerance,
        ) {
            let binding = &self.registry.bindings()[found.binding_index];
            tracing::debug!(
                token = %found.token,
                keyword = %found.keyword,
                distance = found.distance,
                capability = %binding.name,
                "fuzzy matched"
            );
            let matched = vec![found.token.clone()];
            let args = residual_args(&parsed, &matched);
            return self.dispatch(binding, args, request).await;
        }

        self.audit.record(UNRECOGNIZED, request.origin);
        tracing::info!(text = %request.text, origin = %request.origin, "unrecognized command");
        CapabilityResult::unrecognized(&request.text)
    }

    /// Invoke the bound handler on its own task so that neither an `Err`
    /// nor a panic inside a capability can escape the router.
    async fn dispatch(
        &self,
        binding: &CapabilityBinding,
        args: Vec<String>,
        request: &CommandRequest,
    ) -> CapabilityResult {
        self.audit.record(&binding.name, request.origin);
        tracing::debug!(capability = %binding.name, origin = %request.origin, "dispatching");

        let handler = binding.handler();
        let owned = request.clone();
        let invocation = tokio::spawn(async move { handler.invoke(owned, args).await });

        match invocation.await {
            Ok(Ok(result)) => result,
            Ok(Err(error)) => {
                tracing::warn!(capability = %binding.name, %error, "capability failed");
                CapabilityResult::failure("I couldn't complete that request.")
            }
            Err(join_error) => {
                tracing::error!(capability = %binding.name, %join_error, "capability crashed");
                CapabilityResult::failure("I couldn't complete that request.")
            }
        }
    }
}

/// Keywords of `binding` present in the phrase. Single-word keywords match
/// token-for-token; multi-word keywords match as substrings of the
/// normalized text.
fn matched_keywords(binding: &CapabilityBinding, parsed: &ParsedPhrase) -> Vec<String> {
    let normalized = parsed.normalized_text();
    binding
        .keywords
        .iter()
        .filter(|keyword| {
            if keyword.contains(' ') {
                normalized.contains(keyword.as_str())
            } else {
                parsed.lowercase.iter().any(|token| token == *keyword)
            }
        })
        .cloned()
        .collect()
}

/// Tokens left over once matched keywords and filler words are removed;
/// original casing is preserved so arguments like place names stay intact.
fn residual_args(parsed: &ParsedPhrase, matched: &[String]) -> Vec<String> {
    let consumed: Vec<&str> = matched
        .iter()
        .flat_map(|keyword| keyword.split_whitespace())
        .collect();
    parsed
        .tokens
        .iter()
        .zip(parsed.lowercase.iter())
        .filter(|(_, lower)| {
            !parser::is_stopword(lower) && !consumed.contains(&lower.as_str())
        })
        .map(|(token, _)| token.clone())
        .collect()
}

fn combine(results: Vec<CapabilityResult>) -> CapabilityResult {
    let success = results.iter().all(|r| r.success);
    let error_kind = results.iter().find(|r| !r.success).and_then(|r| r.error_kind);
    let reply_text = results
        .iter()
        .map(|r| r.reply_text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    CapabilityResult {
        success,
        reply_text,
        error_kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{boxed_reply_future, FailureKind, FnCapability};
    use crate::command::Origin;
    use crate::error::CoreError;

    fn echo(name: &str, keywords: &[&str]) -> Arc<FnCapability> {
        let label = name.to_string();
        Arc::new(FnCapability::new(
            name,
            keywords.iter().copied(),
            Arc::new(move |_request, args: Vec<String>| {
                let label = label.clone();
                boxed_reply_future(async move {
                    Ok(CapabilityResult::ok(format!("{label}:{}", args.join(","))))
                })
            }),
        ))
    }

    fn test_router(options: RouterOptions) -> Router {
        let mut registry = CapabilityRegistry::new();
        registry.register(echo("weather", &["weather", "forecast"]));
        registry.register(echo("date_time", &["time", "date", "today"]));
        registry.register(echo("lights", &["lights", "light", "lamp"]));
        registry.register(
            Arc::new(
                FnCapability::new(
                    "stop",
                    ["stop", "goodbye"],
                    Arc::new(|_, _| {
                        boxed_reply_future(async { Ok(CapabilityResult::ok("Shutting down.")) })
                    }),
                )
                .mark_unconditional(),
            ),
        );
        registry.register(Arc::new(FnCapability::new(
            "explode",
            ["explode"],
            Arc::new(|_, _| {
                boxed_reply_future(async {
                    Err(CoreError::Internal("connection refused".to_string()))
                })
            }),
        )));
        registry.register(Arc::new(FnCapability::new(
            "panic",
            ["panic"],
            Arc::new(|_, _| {
                boxed_reply_future(async { panic!("handler bug") })
            }),
        )));
        registry.validate().expect("valid registry");
        Router::new(registry, Arc::new(DispatchAudit::new()), options)
    }

    fn request(text: &str) -> CommandRequest {
        CommandRequest::new(text, Origin::Voice)
    }

    #[tokio::test]
    async fn routes_weather_with_residual_place() {
        let router = test_router(RouterOptions::default());
        let result = router.route(request("what's the weather in Paris")).await;
        assert!(result.success);
        assert_eq!(result.reply_text, "weather:Paris");
    }

    #[tokio::test]
    async fn gibberish_is_unrecognized_not_an_error() {
        let router = test_router(RouterOptions::default());
        let result = router.route(request("asdkjhasd")).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(FailureKind::Unrecognized));
    }

    #[tokio::test]
    async fn empty_input_is_unrecognized() {
        let router = test_router(RouterOptions::default());
        let result = router.route(request("   ")).await;
        assert_eq!(result.error_kind, Some(FailureKind::Unrecognized));
    }

    #[tokio::test]
    async fn tie_prefers_more_specific_binding() {
        let mut registry = CapabilityRegistry::new();
        registry.register(echo("broad", &["ping", "pong", "ding"]));
        registry.register(echo("narrow", &["ping"]));
        registry.validate().expect("valid registry");
        let router = Router::new(
            registry,
            Arc::new(DispatchAudit::new()),
            RouterOptions::default(),
        );

        let result = router.route(request("ping")).await;
        assert!(result.reply_text.starts_with("narrow:"));
    }

    #[tokio::test]
    async fn higher_score_beats_specificity() {
        let mut registry = CapabilityRegistry::new();
        registry.register(echo("narrow", &["play"]));
        registry.register(echo("music", &["play", "music", "song"]));
        registry.validate().expect("valid registry");
        let router = Router::new(
            registry,
            Arc::new(DispatchAudit::new()),
            RouterOptions::default(),
        );

        let result = router.route(request("play some music")).await;
        assert!(result.reply_text.starts_with("music:"));
    }

    #[tokio::test]
    async fn unconditional_short_circuits_scoring() {
        let router = test_router(RouterOptions::default());
        let result = router.route(request("stop the weather forecast")).await;
        assert_eq!(result.reply_text, "Shutting down.");
    }

    #[tokio::test]
    async fn capability_error_becomes_executor_failure() {
        let router = test_router(RouterOptions::default());
        let result = router.route(request("explode")).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(FailureKind::ExecutorFailure));
        // internal detail is suppressed from the reply
        assert!(!result.reply_text.contains("connection refused"));
    }

    #[tokio::test]
    async fn capability_panic_becomes_executor_failure() {
        let router = test_router(RouterOptions::default());
        let result = router.route(request("panic")).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(FailureKind::ExecutorFailure));
    }

    #[tokio::test]
    async fn fuzzy_bridges_a_typo() {
        let router = test_router(RouterOptions::default());
        let result = router.route(request("wether in Paris")).await;
        assert!(result.success);
        assert_eq!(result.reply_text, "weather:Paris");
    }

    #[tokio::test]
    async fn compound_phrase_dispatches_each_part() {
        let router = test_router(RouterOptions::default());
        let result = router.route(request("weather in Paris and lights")).await;
        assert!(result.success);
        assert!(result.reply_text.contains("weather:Paris"));
        assert!(result.reply_text.contains("lights:"));
    }

    #[tokio::test]
    async fn compound_surfaces_first_failure_kind() {
        let router = test_router(RouterOptions::default());
        let result = router.route(request("explode and weather")).await;
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(FailureKind::ExecutorFailure));
        assert!(result.reply_text.contains("weather:"));
    }

    #[tokio::test]
    async fn every_dispatch_is_audited() {
        let audit = Arc::new(DispatchAudit::new());
        let mut registry = CapabilityRegistry::new();
        registry.register(echo("weather", &["weather"]));
        registry.validate().expect("valid registry");
        let router = Router::new(registry, audit.clone(), RouterOptions::default());

        router.route(request("weather")).await;
        router.route(request("weather again")).await;
        router.route(request("zzzzqqq")).await;

        let snapshot = audit.snapshot();
        let weather = snapshot.iter().find(|e| e.capability == "weather").unwrap();
        assert_eq!(weather.count, 2);
        let unknown = snapshot.iter().find(|e| e.capability == UNRECOGNIZED).unwrap();
        assert_eq!(unknown.count, 1);
    }
}
