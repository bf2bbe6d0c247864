use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use utoipa::ToSchema;

use crate::command::Origin;
use crate::utils::time::now_secs;

/// Audit key used when no binding matched.
pub const UNRECOGNIZED: &str = "unrecognized";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditEntry {
    pub capability: String,
    pub count: u64,
    pub last_seen: u64,
    pub last_origin: String,
}

/// Per-capability dispatch counters. Recording must never block or fail a
/// dispatch, so writes use `try_lock` and drop the sample on contention.
#[derive(Debug, Default)]
pub struct DispatchAudit {
    entries: Mutex<HashMap<String, AuditEntry>>,
}

impl DispatchAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, capability: &str, origin: Origin) {
        let Ok(mut entries) = self.entries.try_lock() else {
            return;
        };
        let entry = entries
            .entry(capability.to_string())
            .or_insert_with(|| AuditEntry {
                capability: capability.to_string(),
                count: 0,
                last_seen: 0,
                last_origin: String::new(),
            });
        entry.count += 1;
        entry.last_seen = now_secs();
        entry.last_origin = origin.to_string();
    }

    pub fn snapshot(&self) -> Vec<AuditEntry> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        let mut snapshot: Vec<AuditEntry> = entries.values().cloned().collect();
        snapshot.sort_by(|a, b| a.capability.cmp(&b.capability));
        snapshot
    }
}
