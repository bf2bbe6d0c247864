use std::sync::Arc;

use crate::capability::{boxed_reply_future, CapabilityRegistry, CapabilityResult, FnCapability};
use crate::routing::DispatchAudit;

pub const NAME: &str = "diagnostics";

pub fn register(registry: &mut CapabilityRegistry, audit: Arc<DispatchAudit>) {
    registry.register(Arc::new(FnCapability::new(
        NAME,
        ["diagnostics", "report", "status"],
        Arc::new(move |_request, _args| {
            let audit = audit.clone();
            boxed_reply_future(async move { Ok(CapabilityResult::ok(summarize(&audit))) })
        }),
    )));
}

fn summarize(audit: &DispatchAudit) -> String {
    let snapshot = audit.snapshot();
    if snapshot.is_empty() {
        return "Nothing has been dispatched yet.".to_string();
    }
    let total: u64 = snapshot.iter().map(|e| e.count).sum();
    match snapshot.iter().max_by_key(|e| e.count) {
        Some(busiest) => format!(
            "Handled {total} commands across {} capabilities. Busiest: {} ({} dispatches).",
            snapshot.len(),
            busiest.capability,
            busiest.count
        ),
        None => "Nothing has been dispatched yet.".to_string(),
    }
}
