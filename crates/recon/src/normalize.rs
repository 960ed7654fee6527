//! Comparison forms for free-text provider fields.
//!
//! Every function here is total: malformed input normalizes to an empty
//! string (or an empty token list), never to an error.

use crate::model::{PanelProvider, RawProviderRecord};

/// Literal placeholder some upstream extracts put in place of an address.
pub const MISSING_ADDRESS_SENTINEL: &str = "missing address";

/// A batch row with its comparison forms computed once.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub raw: RawProviderRecord,
    pub name: String,
    pub name_tokens: Vec<String>,
    pub address: String,
    pub contact_digits: String,
}

impl NormalizedRecord {
    pub fn has_usable_address(&self) -> bool {
        !is_missing_address(&self.address)
    }
}

/// Comparison forms of a panel provider, precomputed at directory load.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPanel {
    pub name: String,
    pub name_tokens: Vec<String>,
    pub address: String,
    pub contact_digits: String,
}

pub fn normalize(raw: &RawProviderRecord) -> NormalizedRecord {
    let name = normalize_name(&raw.name);
    NormalizedRecord {
        name_tokens: name_tokens(&name),
        name,
        address: normalize_address(&raw.address),
        contact_digits: contact_digits(&raw.contact),
        raw: raw.clone(),
    }
}

pub fn normalize_panel(provider: &PanelProvider) -> NormalizedPanel {
    let name = normalize_name(&provider.name);
    NormalizedPanel {
        name_tokens: name_tokens(&name),
        name,
        address: normalize_address(&provider.address),
        contact_digits: contact_digits(&provider.contact),
    }
}

/// Trim, collapse runs of whitespace to one space, lowercase.
pub fn normalize_name(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

/// Same folding as names. Unit/suite qualifiers are kept: address
/// comparison is a plain leading-character comparison.
pub fn normalize_address(address: &str) -> String {
    collapse_whitespace(address).to_lowercase()
}

/// Digits only; formatting (spaces, dashes, `+`, parentheses) is dropped.
pub fn contact_digits(contact: &str) -> String {
    contact.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Words of an already-normalized name with surrounding punctuation removed.
pub fn name_tokens(normalized_name: &str) -> Vec<String> {
    normalized_name
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Blank, or the literal "Missing address" placeholder (any casing/spacing).
pub fn is_missing_address(address: &str) -> bool {
    let folded = normalize_address(address);
    folded.is_empty() || folded == MISSING_ADDRESS_SENTINEL
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, address: &str, contact: &str) -> RawProviderRecord {
        RawProviderRecord {
            source_id: "r1".into(),
            name: name.into(),
            address: address.into(),
            contact: contact.into(),
            source_file: "upload.xlsx".into(),
        }
    }

    #[test]
    fn name_is_trimmed_collapsed_and_folded() {
        assert_eq!(normalize_name("  Klinik   ABC\t Sdn Bhd "), "klinik abc sdn bhd");
    }

    #[test]
    fn tokens_drop_punctuation() {
        let name = normalize_name("Dr. Tan's Clinic (Cheras) & Co.");
        assert_eq!(name_tokens(&name), vec!["dr", "tan's", "clinic", "cheras", "co"]);
    }

    #[test]
    fn address_keeps_unit_qualifiers() {
        assert_eq!(
            normalize_address(" Suite 5,  Jalan Tun Razak "),
            "suite 5, jalan tun razak"
        );
    }

    #[test]
    fn contact_keeps_only_digits() {
        assert_eq!(contact_digits("+60 (3) 1234-5678"), "60312345678");
        assert_eq!(contact_digits("n/a"), "");
    }

    #[test]
    fn missing_address_detection() {
        assert!(is_missing_address(""));
        assert!(is_missing_address("   "));
        assert!(is_missing_address("Missing address"));
        assert!(is_missing_address("  MISSING   Address "));
        assert!(!is_missing_address("Jalan Ampang"));
    }

    #[test]
    fn normalize_keeps_display_record() {
        let r = raw("  Hospital  XYZ ", "Jalan Bukit Bintang", "03-2141 0000");
        let n = normalize(&r);
        assert_eq!(n.raw, r);
        assert_eq!(n.name, "hospital xyz");
        assert_eq!(n.name_tokens, vec!["hospital", "xyz"]);
        assert_eq!(n.address, "jalan bukit bintang");
        assert_eq!(n.contact_digits, "0321410000");
        assert!(n.has_usable_address());
    }

    #[test]
    fn empty_fields_normalize_to_empty() {
        let n = normalize(&raw("", "", ""));
        assert!(n.name.is_empty());
        assert!(n.name_tokens.is_empty());
        assert!(!n.has_usable_address());
    }
}
