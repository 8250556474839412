//! Query filters for audit entries.
//!
//! A filter is a mapping of optional criteria that are ANDed together. It
//! deserializes from the camelCase keys callers send (`userId`,
//! `eventType`, `startDate`, ...); unrecognised keys are ignored, and an
//! empty string for any key imposes no constraint.

use crate::audit::entry::AuditEntry;
use crate::audit::event::{EventType, HipaaCategory};
use crate::core::{Error, Result, Timestamp};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Filter for querying audit entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditFilter {
    /// Substring match on user id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Exact event type
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "de_event_type")]
    pub event_type: Option<EventType>,
    /// Any of these event types
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub event_types: Vec<EventType>,
    /// Exact resource type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Inclusive lower bound
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "de_start_date")]
    pub start_date: Option<Timestamp>,
    /// Inclusive upper bound; a bare date covers the whole day
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "de_end_date")]
    pub end_date: Option<Timestamp>,
    /// Exact PHI flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phi_involved: Option<bool>,
    /// Exact HIPAA category
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "de_category")]
    pub hipaa_category: Option<HipaaCategory>,
    /// Maximum results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Offset for pagination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl AuditFilter {
    /// Create a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching denied-access and breach-attempt events.
    pub fn security_events() -> Self {
        Self::new().by_any_event_type(vec![EventType::AccessDenied, EventType::BreachAttempt])
    }

    /// Parse a filter mapping from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidFilter(e.to_string()))
    }

    /// Filter by user (substring).
    pub fn by_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Filter by event type.
    pub fn by_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Filter by any of several event types.
    pub fn by_any_event_type(mut self, event_types: Vec<EventType>) -> Self {
        self.event_types = event_types;
        self
    }

    /// Filter by resource type.
    pub fn by_resource_type(mut self, resource_type: &str) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self
    }

    /// Filter by date range (both ends inclusive).
    pub fn by_date_range(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.start_date = Some(from);
        self.end_date = Some(to);
        self
    }

    /// Entries at or after `from`.
    pub fn since(mut self, from: Timestamp) -> Self {
        self.start_date = Some(from);
        self
    }

    /// Entries at or before `to`.
    pub fn until(mut self, to: Timestamp) -> Self {
        self.end_date = Some(to);
        self
    }

    /// Filter by PHI involvement.
    pub fn by_phi(mut self, phi_involved: bool) -> Self {
        self.phi_involved = Some(phi_involved);
        self
    }

    /// Filter by HIPAA category.
    pub fn by_category(mut self, category: HipaaCategory) -> Self {
        self.hipaa_category = Some(category);
        self
    }

    /// Set result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set pagination offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Same criteria with pagination removed.
    ///
    /// Destinations receive this: paging only makes sense after results from
    /// all destinations have been merged.
    pub fn without_pagination(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// Apply offset then limit to an already ordered result set.
    pub fn paginate(&self, entries: Vec<AuditEntry>) -> Vec<AuditEntry> {
        let offset = self.offset.unwrap_or(0);
        let iter = entries.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }

    /// Check if an entry matches this filter.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(user_id) = self.user_id.as_deref().filter(|s| !s.is_empty()) {
            if !entry.user_id().contains(user_id) {
                return false;
            }
        }

        if let Some(event_type) = &self.event_type {
            if entry.event_type() != event_type {
                return false;
            }
        }

        if !self.event_types.is_empty() && !self.event_types.contains(entry.event_type()) {
            return false;
        }

        if let Some(resource_type) = self.resource_type.as_deref().filter(|s| !s.is_empty()) {
            if entry.resource_type() != resource_type {
                return false;
            }
        }

        if let Some(from) = self.start_date {
            if entry.timestamp() < from {
                return false;
            }
        }

        if let Some(to) = self.end_date {
            if entry.timestamp() > to {
                return false;
            }
        }

        if let Some(phi) = self.phi_involved {
            if entry.phi_involved() != phi {
                return false;
            }
        }

        if let Some(category) = self.hipaa_category {
            if entry.hipaa_category() != category {
                return false;
            }
        }

        true
    }

    /// Render the criteria as URL query pairs for destinations that filter
    /// remotely. Pagination is never included.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(user_id) = self.user_id.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("userId", user_id.to_string()));
        }
        if let Some(event_type) = &self.event_type {
            pairs.push(("eventType", event_type.to_string()));
        }
        for event_type in &self.event_types {
            pairs.push(("eventTypes", event_type.to_string()));
        }
        if let Some(resource_type) = self.resource_type.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("resourceType", resource_type.to_string()));
        }
        if let Some(from) = self.start_date {
            pairs.push(("startDate", from.to_rfc3339()));
        }
        if let Some(to) = self.end_date {
            pairs.push(("endDate", to.to_rfc3339()));
        }
        if let Some(phi) = self.phi_involved {
            pairs.push(("phiInvolved", phi.to_string()));
        }
        if let Some(category) = self.hipaa_category {
            pairs.push(("hipaaCategory", category.to_string()));
        }
        pairs
    }
}

/// Parse a date bound given as RFC 3339 or `YYYY-MM-DD`.
///
/// A bare date maps to the start of that day, or to its last instant when
/// `end_of_day` is set, so that an inclusive upper bound covers the day.
pub fn parse_date_bound(value: &str, end_of_day: bool) -> Result<Timestamp> {
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Error::InvalidFilter(format!("invalid date '{}': {}", value, e)))?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::InvalidFilter(format!("invalid date '{}'", value)))
}

fn non_empty<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn de_event_type<'de, D>(deserializer: D) -> std::result::Result<Option<EventType>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty(deserializer)?.map(EventType::from))
}

fn de_category<'de, D>(deserializer: D) -> std::result::Result<Option<HipaaCategory>, D::Error>
where
    D: Deserializer<'de>,
{
    non_empty(deserializer)?
        .map(|s| s.parse().map_err(D::Error::custom))
        .transpose()
}

fn de_start_date<'de, D>(deserializer: D) -> std::result::Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    non_empty(deserializer)?
        .map(|s| parse_date_bound(&s, false).map_err(D::Error::custom))
        .transpose()
}

fn de_end_date<'de, D>(deserializer: D) -> std::result::Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    non_empty(deserializer)?
        .map(|s| parse_date_bound(&s, true).map_err(D::Error::custom))
        .transpose()
}
