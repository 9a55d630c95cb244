//! Parameter Name Tests
//!
//! Tests verify:
//! - Canonical form of padded and colon-terminated names
//! - Idempotence
//! - ASCII validation
//! - Equality and lookup by canonical form

use std::collections::HashSet;

use dlcpro::{canonicalize, DlcError, ParameterName};

#[test]
fn test_documented_examples() {
    for raw in ["foo ", "foo:", " foo : "] {
        assert_eq!(canonicalize(raw).unwrap().as_str(), "foo");
    }
}

#[test]
fn test_canonicalize_is_idempotent() {
    let inputs = [
        "laser1:dl:cc:current-set",
        "  laser1:dl:cc:current-set:  ",
        "laser1:ctl:wavelength-act:: \t",
        "uptime",
        "a : : ",
    ];
    for raw in inputs {
        let once = canonicalize(raw).unwrap();
        let twice = canonicalize(once.as_str()).unwrap();
        assert_eq!(once, twice, "input {:?}", raw);
    }
}

#[test]
fn test_bytes_and_text_agree() {
    let from_text = ParameterName::new("emission ").unwrap();
    let from_bytes = ParameterName::new(b"emission:".as_slice()).unwrap();
    assert_eq!(from_text, from_bytes);
    assert_eq!(from_bytes.as_bytes(), b"emission");
}

#[test]
fn test_non_ascii_rejected() {
    let err = canonicalize("laser1:dl:cc:current-set\u{00b5}").unwrap_err();
    assert!(matches!(err, DlcError::InvalidParameterName(_)));
}

#[test]
fn test_lookup_uses_canonical_form() {
    let mut names = HashSet::new();
    names.insert(canonicalize("laser1:dl:tc:temp-act").unwrap());

    assert!(names.contains(&canonicalize(" laser1:dl:tc:temp-act: ").unwrap()));
    assert!(!names.contains(&canonicalize("laser1:dl:tc:temp-set").unwrap()));
}

#[test]
fn test_parse_and_display() {
    let name: ParameterName = "system-label :".parse().unwrap();
    assert_eq!(name.to_string(), "system-label");
    assert!(ParameterName::try_from("   ").is_err());
}
