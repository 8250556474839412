//! Activity summary over a set of entries.

use crate::audit::entry::AuditEntry;
use crate::core::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Window counted as recent activity.
pub const RECENT_WINDOW_MINUTES: i64 = 60;

/// Aggregate counts over audit entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total_logs: usize,
    pub by_event_type: BTreeMap<String, usize>,
    pub by_resource_type: BTreeMap<String, usize>,
    pub by_hipaa_category: BTreeMap<String, usize>,
    pub phi_involved: usize,
    pub security_events: usize,
    /// Entries in the hour before `now`
    pub recent_activity: usize,
}

impl AuditSummary {
    pub fn from_entries(entries: &[AuditEntry], now: Timestamp) -> Self {
        let recent_since = now - chrono::Duration::minutes(RECENT_WINDOW_MINUTES);
        let mut summary = Self {
            total_logs: entries.len(),
            ..Self::default()
        };

        for entry in entries {
            *summary
                .by_event_type
                .entry(entry.event_type().to_string())
                .or_default() += 1;
            *summary
                .by_resource_type
                .entry(entry.resource_type().to_string())
                .or_default() += 1;
            *summary
                .by_hipaa_category
                .entry(entry.hipaa_category().to_string())
                .or_default() += 1;

            if entry.phi_involved() {
                summary.phi_involved += 1;
            }
            if entry.event_type().is_security_event() {
                summary.security_events += 1;
            }
            if entry.timestamp() > recent_since {
                summary.recent_activity += 1;
            }
        }
        summary
    }
}
