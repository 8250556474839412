//! Audit event vocabulary.

use serde::{Deserialize, Serialize};

/// Kind of event being audited.
///
/// The nine named variants are the recognised vocabulary. Anything else read
/// from a store or supplied as a string is kept verbatim in `Other`, so that
/// classification can fall back instead of rejecting the entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Login,
    Logout,
    Create,
    Read,
    Update,
    Delete,
    Export,
    AccessDenied,
    BreachAttempt,
    /// Unrecognised event name
    Other(String),
}

impl EventType {
    /// Wire name of the event.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Login => "login",
            EventType::Logout => "logout",
            EventType::Create => "create",
            EventType::Read => "read",
            EventType::Update => "update",
            EventType::Delete => "delete",
            EventType::Export => "export",
            EventType::AccessDenied => "access_denied",
            EventType::BreachAttempt => "breach_attempt",
            EventType::Other(name) => name,
        }
    }

    /// Security-relevant events (denied access, breach attempts).
    pub fn is_security_event(&self) -> bool {
        matches!(self, EventType::AccessDenied | EventType::BreachAttempt)
    }

    /// Whether this is one of the recognised event names.
    pub fn is_known(&self) -> bool {
        !matches!(self, EventType::Other(_))
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "login" => EventType::Login,
            "logout" => EventType::Logout,
            "create" => EventType::Create,
            "read" => EventType::Read,
            "update" => EventType::Update,
            "delete" => EventType::Delete,
            "export" => EventType::Export,
            "access_denied" => EventType::AccessDenied,
            "breach_attempt" => EventType::BreachAttempt,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        EventType::from(value.as_str())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HIPAA classification of an audit event.
///
/// The first three are Security Rule safeguard families, the rest are
/// Privacy Rule categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HipaaCategory {
    Administrative,
    Physical,
    Technical,
    Use,
    Disclosure,
    Access,
    Amendment,
}

impl HipaaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            HipaaCategory::Administrative => "administrative",
            HipaaCategory::Physical => "physical",
            HipaaCategory::Technical => "technical",
            HipaaCategory::Use => "use",
            HipaaCategory::Disclosure => "disclosure",
            HipaaCategory::Access => "access",
            HipaaCategory::Amendment => "amendment",
        }
    }
}

impl std::fmt::Display for HipaaCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HipaaCategory {
    type Err = crate::core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrative" => Ok(HipaaCategory::Administrative),
            "physical" => Ok(HipaaCategory::Physical),
            "technical" => Ok(HipaaCategory::Technical),
            "use" => Ok(HipaaCategory::Use),
            "disclosure" => Ok(HipaaCategory::Disclosure),
            "access" => Ok(HipaaCategory::Access),
            "amendment" => Ok(HipaaCategory::Amendment),
            other => Err(crate::core::Error::InvalidFilter(format!(
                "unknown HIPAA category '{}'",
                other
            ))),
        }
    }
}
