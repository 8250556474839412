//! Compliance Module
//!
//! HIPAA tagging for audit entries:
//! - Event categorisation
//! - PHI detection
//! - Display masking

pub mod hipaa;
pub mod mask;

pub use hipaa::{contains_phi, hipaa_category, phi_involved, tag, ComplianceTag};
pub use mask::{mask_phi, PhiField};
