//! HIPAA compliance tagging.
//!
//! Derives the `compliance` block of an audit entry from its event type,
//! resource type and details. Everything here is a pure function of its
//! inputs, so tagging the same triple twice yields identical output.

use crate::audit::event::{EventType, HipaaCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Encryption status recorded on every entry.
pub const ENCRYPTION_STATUS: &str = "encrypted";

/// Retention label recorded on every entry.
pub const RETENTION_PERIOD: &str = "7_years";

/// Field names that mark a payload as carrying PHI.
pub const PHI_FIELDS: [&str; 15] = [
    "name",
    "address",
    "phone",
    "email",
    "ssn",
    "medicalRecordNumber",
    "birthDate",
    "diagnosis",
    "medications",
    "labResults",
    "treatmentPlans",
    "insuranceInfo",
    "emergencyContact",
    "familyHistory",
    "geneticInfo",
];

/// FHIR resource types whose instances always carry PHI.
pub const PHI_RESOURCE_TYPES: [&str; 12] = [
    "Patient",
    "Observation",
    "MedicationRequest",
    "Medication",
    "Condition",
    "Procedure",
    "AllergyIntolerance",
    "Immunization",
    "DocumentReference",
    "CarePlan",
    "Encounter",
    "Goal",
];

/// Compliance classification attached to an audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceTag {
    /// HIPAA category of the event
    pub hipaa_category: HipaaCategory,
    /// Whether the event touched PHI
    pub phi_involved: bool,
    /// Encryption status label
    pub encryption_status: String,
    /// Retention label
    pub retention_period: String,
}

/// Map an event type to its HIPAA category.
///
/// Unlisted events (including unrecognised names) fall back to
/// `Technical` rather than being rejected.
pub fn hipaa_category(event_type: &EventType) -> HipaaCategory {
    match event_type {
        EventType::Login | EventType::Logout | EventType::Create => HipaaCategory::Technical,
        EventType::Read | EventType::Export => HipaaCategory::Access,
        EventType::Update | EventType::Delete => HipaaCategory::Use,
        EventType::AccessDenied | EventType::BreachAttempt | EventType::Other(_) => {
            HipaaCategory::Technical
        }
    }
}

/// Whether a resource type is a PHI-bearing clinical resource.
pub fn is_phi_resource(resource_type: &str) -> bool {
    PHI_RESOURCE_TYPES.contains(&resource_type)
}

/// Whether a JSON payload mentions any PHI field name.
///
/// The payload is serialized and matched case-insensitively, so keys and
/// values both count. Scalars and null never match.
pub fn contains_phi(data: &serde_json::Value) -> bool {
    if !(data.is_object() || data.is_array()) {
        return false;
    }
    let text = data.to_string().to_lowercase();
    PHI_FIELDS
        .iter()
        .any(|field| text.contains(&field.to_lowercase()))
}

/// Whether an event on `resource_type` with `details` involves PHI.
pub fn phi_involved(resource_type: &str, details: &BTreeMap<String, serde_json::Value>) -> bool {
    if is_phi_resource(resource_type) {
        return true;
    }
    if details.is_empty() {
        return false;
    }
    match serde_json::to_value(details) {
        Ok(value) => contains_phi(&value),
        Err(_) => false,
    }
}

/// Derive the full compliance block.
pub fn tag(
    event_type: &EventType,
    resource_type: &str,
    details: &BTreeMap<String, serde_json::Value>,
) -> ComplianceTag {
    ComplianceTag {
        hipaa_category: hipaa_category(event_type),
        phi_involved: phi_involved(resource_type, details),
        encryption_status: ENCRYPTION_STATUS.to_string(),
        retention_period: RETENTION_PERIOD.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn details(pairs: &[(&str, serde_json::Value)]) -> BTreeMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(hipaa_category(&EventType::Login), HipaaCategory::Technical);
        assert_eq!(hipaa_category(&EventType::Logout), HipaaCategory::Technical);
        assert_eq!(hipaa_category(&EventType::Create), HipaaCategory::Technical);
        assert_eq!(hipaa_category(&EventType::Read), HipaaCategory::Access);
        assert_eq!(hipaa_category(&EventType::Export), HipaaCategory::Access);
        assert_eq!(hipaa_category(&EventType::Update), HipaaCategory::Use);
        assert_eq!(hipaa_category(&EventType::Delete), HipaaCategory::Use);
    }

    #[test]
    fn test_category_fallback() {
        assert_eq!(
            hipaa_category(&EventType::BreachAttempt),
            HipaaCategory::Technical
        );
        assert_eq!(
            hipaa_category(&EventType::from("something_new")),
            HipaaCategory::Technical
        );
    }

    #[test]
    fn test_patient_always_phi() {
        assert!(phi_involved("Patient", &BTreeMap::new()));
        assert!(phi_involved("Patient", &details(&[("note", json!("none"))])));
    }

    #[test]
    fn test_session_phi_depends_on_details() {
        assert!(!phi_involved("Session", &BTreeMap::new()));
        assert!(phi_involved("Session", &details(&[("ssn", json!("x"))])));
    }

    #[test]
    fn test_phi_match_is_case_insensitive_and_substring() {
        assert!(phi_involved(
            "HL7Message",
            &details(&[("patientName", json!("Jane Doe"))])
        ));
        assert!(phi_involved(
            "Session",
            &details(&[("note", json!("updated BIRTHDATE field"))])
        ));
        assert!(!phi_involved(
            "HL7Message",
            &details(&[("messageType", json!("ADT^A01"))])
        ));
    }

    #[test]
    fn test_contains_phi_scalars() {
        assert!(!contains_phi(&json!("ssn")));
        assert!(!contains_phi(&serde_json::Value::Null));
        assert!(contains_phi(&json!(["email"])));
    }

    #[test]
    fn test_tag_is_deterministic() {
        let d = details(&[("diagnosis", json!("J45")), ("count", json!(3))]);
        let a = tag(&EventType::Update, "Condition", &d);
        let b = tag(&EventType::Update, "Condition", &d);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(a.encryption_status, "encrypted");
        assert_eq!(a.retention_period, "7_years");
    }

    #[test]
    fn test_tag_serializes_camel_case() {
        let t = tag(&EventType::Read, "Patient", &BTreeMap::new());
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["hipaaCategory"], "access");
        assert_eq!(value["phiInvolved"], true);
    }
}
