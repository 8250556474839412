//! Display masking for PHI values.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SSN: Regex = Regex::new(r"(\d{3})-(\d{2})-(\d{4})").unwrap();
    static ref PHONE: Regex = Regex::new(r"(\d{3})-(\d{3})-(\d{4})").unwrap();
}

/// Kind of PHI value being masked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhiField {
    Ssn,
    Phone,
    Email,
    Name,
    Address,
    /// Anything else passes through unchanged
    Other,
}

/// Partially mask a PHI value for display.
pub fn mask_phi(value: &str, field: PhiField) -> String {
    if value.is_empty() {
        return String::new();
    }

    match field {
        PhiField::Ssn => SSN.replace(value, "***-**-$3").into_owned(),
        PhiField::Phone => PHONE.replace(value, "***-***-$3").into_owned(),
        PhiField::Email => match value.split_once('@') {
            Some((local, domain)) => {
                let first: String = local.chars().take(1).collect();
                format!("{}***@{}", first, domain)
            }
            None => value.to_string(),
        },
        PhiField::Name => value
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        let rest = chars.count();
                        format!("{}{}", first, "*".repeat(rest))
                    }
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
        PhiField::Address => value
            .split(' ')
            .enumerate()
            .map(|(i, part)| {
                if i < 2 {
                    part.to_string()
                } else {
                    "*".repeat(part.chars().count())
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
        PhiField::Other => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_ssn() {
        assert_eq!(mask_phi("123-45-6789", PhiField::Ssn), "***-**-6789");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phi("555-123-4567", PhiField::Phone), "***-***-4567");
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_phi("john.doe@example.org", PhiField::Email), "j***@example.org");
        assert_eq!(mask_phi("not-an-email", PhiField::Email), "not-an-email");
    }

    #[test]
    fn test_mask_name() {
        assert_eq!(mask_phi("Jane Doe", PhiField::Name), "J*** D**");
    }

    #[test]
    fn test_mask_address() {
        assert_eq!(
            mask_phi("12 Main Street Springfield", PhiField::Address),
            "12 Main ****** ***********"
        );
    }

    #[test]
    fn test_other_passthrough() {
        assert_eq!(mask_phi("O+", PhiField::Other), "O+");
        assert_eq!(mask_phi("", PhiField::Ssn), "");
    }
}
