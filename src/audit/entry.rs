//! Audit entry structure.
//!
//! Immutable, append-only audit record. Built once through
//! [`AuditEntryBuilder`], which stamps the id and timestamp and derives the
//! compliance block; there is no way to change an entry afterwards.

use crate::audit::event::{EventType, HipaaCategory};
use crate::compliance::hipaa::{self, ComplianceTag};
use crate::core::{now, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event payload: ordered so that serialization is deterministic.
pub type Details = BTreeMap<String, serde_json::Value>;

/// Placeholder IP when the caller's address is unknown.
pub const UNKNOWN_IP: &str = "127.0.0.1";

/// Placeholder user agent when none is available.
pub const UNKNOWN_USER_AGENT: &str = "unknown";

/// Unique entry identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    /// Create a new entry ID.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a unique ID.
    pub fn generate() -> Self {
        Self(format!("audit-{}", uuid::Uuid::new_v4()))
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a request came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Active session reference
    pub session_id: Option<String>,
    /// Client IP address
    pub ip_address: String,
    /// Client user agent
    pub user_agent: String,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            session_id: None,
            ip_address: UNKNOWN_IP.to_string(),
            user_agent: UNKNOWN_USER_AGENT.to_string(),
        }
    }
}

impl Provenance {
    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip_address = ip.to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }
}

/// Supplies the provenance of the current request at entry-build time.
///
/// The session is a weak reference: the audit record only stores its id.
pub trait ProvenanceSource: Send + Sync {
    fn current(&self) -> Provenance;
}

/// Provenance source that always returns the same value.
#[derive(Clone, Debug, Default)]
pub struct StaticProvenance(pub Provenance);

impl ProvenanceSource for StaticProvenance {
    fn current(&self) -> Provenance {
        self.0.clone()
    }
}

/// An audit entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    id: EntryId,
    timestamp: Timestamp,
    event_type: EventType,
    user_id: String,
    session_id: Option<String>,
    resource_type: String,
    resource_id: Option<String>,
    ip_address: String,
    user_agent: String,
    #[serde(default)]
    details: Details,
    compliance: ComplianceTag,
}

impl AuditEntry {
    /// Start building an entry for `event_type` on `resource_type`.
    pub fn builder(event_type: EventType, resource_type: &str) -> AuditEntryBuilder {
        AuditEntryBuilder::new(event_type, resource_type)
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn compliance(&self) -> &ComplianceTag {
        &self.compliance
    }

    /// Shorthand for `compliance().hipaa_category`.
    pub fn hipaa_category(&self) -> HipaaCategory {
        self.compliance.hipaa_category
    }

    /// Shorthand for `compliance().phi_involved`.
    pub fn phi_involved(&self) -> bool {
        self.compliance.phi_involved
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> crate::core::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> crate::core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Builder for [`AuditEntry`].
#[derive(Clone, Debug)]
pub struct AuditEntryBuilder {
    event_type: EventType,
    resource_type: String,
    user_id: String,
    resource_id: Option<String>,
    details: Details,
    provenance: Provenance,
    timestamp: Option<Timestamp>,
}

impl AuditEntryBuilder {
    fn new(event_type: EventType, resource_type: &str) -> Self {
        Self {
            event_type,
            resource_type: resource_type.to_string(),
            user_id: String::new(),
            resource_id: None,
            details: Details::new(),
            provenance: Provenance::default(),
            timestamp: None,
        }
    }

    /// Set the acting user.
    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = user_id.to_string();
        self
    }

    /// Set the resource instance.
    pub fn with_resource_id(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    /// Add a detail.
    pub fn with_detail(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "audit detail not serializable, recorded as null");
            serde_json::Value::Null
        });
        self.details.insert(key.to_string(), value);
        self
    }

    /// Replace all details.
    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    /// Set request provenance.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Pin the timestamp instead of using the current time.
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Stamp id and timestamp, derive compliance, and freeze the entry.
    pub fn build(self) -> AuditEntry {
        let compliance = hipaa::tag(&self.event_type, &self.resource_type, &self.details);
        AuditEntry {
            id: EntryId::generate(),
            timestamp: self.timestamp.unwrap_or_else(now),
            event_type: self.event_type,
            user_id: self.user_id,
            session_id: self.provenance.session_id,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            ip_address: self.provenance.ip_address,
            user_agent: self.provenance.user_agent,
            details: self.details,
            compliance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_id() {
        let id = EntryId::new("test-id");
        assert_eq!(id.as_str(), "test-id");
        assert_eq!(id.to_string(), "test-id");
    }

    #[test]
    fn test_entry_id_generate() {
        let id1 = EntryId::generate();
        let id2 = EntryId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("audit-"));
    }

    #[test]
    fn test_audit_entry_creation() {
        let entry = AuditEntry::builder(EventType::Login, "Session")
            .with_user("user1")
            .with_resource_id("sess-1")
            .build();

        assert!(!entry.id().as_str().is_empty());
        assert_eq!(entry.user_id(), "user1");
        assert_eq!(entry.resource_id(), Some("sess-1"));
        assert_eq!(entry.ip_address(), UNKNOWN_IP);
        assert_eq!(entry.hipaa_category(), HipaaCategory::Technical);
        assert!(!entry.phi_involved());
    }

    #[test]
    fn test_compliance_derived_from_details() {
        let entry = AuditEntry::builder(EventType::Create, "HL7Message")
            .with_detail("patientName", "Jane Doe")
            .build();
        assert!(entry.phi_involved());
        assert_eq!(
            entry.compliance(),
            &hipaa::tag(entry.event_type(), entry.resource_type(), entry.details())
        );
    }

    #[test]
    fn test_unserializable_detail_is_kept_as_null() {
        let mut keyed_by_tuple = std::collections::HashMap::new();
        keyed_by_tuple.insert((1, 2), "x");

        let entry = AuditEntry::builder(EventType::Update, "Patient")
            .with_detail("coordinates", keyed_by_tuple)
            .build();
        assert_eq!(entry.details().get("coordinates"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_provenance_is_copied() {
        let provenance = Provenance::default()
            .with_session("sess-42")
            .with_ip("10.0.0.7")
            .with_user_agent("curl/8.0");
        let entry = AuditEntry::builder(EventType::Read, "Patient")
            .with_provenance(provenance)
            .build();

        assert_eq!(entry.session_id(), Some("sess-42"));
        assert_eq!(entry.ip_address(), "10.0.0.7");
        assert_eq!(entry.user_agent(), "curl/8.0");
    }

    #[test]
    fn test_pinned_timestamp() {
        let ts = now() - chrono::Duration::days(3);
        let entry = AuditEntry::builder(EventType::Read, "Patient").at(ts).build();
        assert_eq!(entry.timestamp(), ts);
    }

    #[test]
    fn test_entry_serialization() {
        let entry = AuditEntry::builder(EventType::Update, "Observation")
            .with_user("user1")
            .with_detail("labResults", json!({"hba1c": 6.1}))
            .build();
        let json = entry.to_json().unwrap();
        assert!(json.contains("\"eventType\":\"update\""));
        assert!(json.contains("\"hipaaCategory\":\"use\""));

        let parsed = AuditEntry::from_json(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
