mod address;
mod domain;
mod local;
mod types;

pub use address::parse_address;
pub use types::{AddressError, ParsedAddress, SyntaxReport};

use domain::check_domain;
use local::is_local_valid;

/// Applies the practical RFC 5322 grammar to an already parsed address.
///
/// Never performs I/O and never fails: a bad address is simply `ok == false`
/// with the reasons listed.
pub fn validate_syntax(address: &ParsedAddress) -> SyntaxReport {
    let mut reasons = Vec::new();

    let local = address.local_part.as_str();
    let total = local.len() + 1 + address.domain.len();
    if total > 254 {
        reasons.push(format!("total length {total} > 254"));
    }

    if local.is_empty() || local.len() > 64 {
        reasons.push(format!(
            "local part length {} invalid (1..=64)",
            local.len()
        ));
    }
    if !is_local_valid(local) {
        reasons.push("invalid local part".to_string());
    }

    check_domain(&address.domain, &mut reasons);

    SyntaxReport {
        ok: reasons.is_empty(),
        reasons,
    }
}

/// Domain-only grammar check; empty when the (ASCII) domain is fine.
pub fn validate_domain(domain_ascii: &str) -> Vec<String> {
    let mut reasons = Vec::new();
    check_domain(domain_ascii, &mut reasons);
    reasons
}

/// Parse + grammar in one go; a parse failure is reported as a reason.
pub fn validate_address(raw: &str) -> SyntaxReport {
    match parse_address(raw) {
        Ok(parsed) => validate_syntax(&parsed),
        Err(err) => SyntaxReport {
            ok: false,
            reasons: vec![err.to_string()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn accepts_basic() {
        let r = validate_address("alice@example.com");
        assert!(r.ok, "{:?}", r.reasons);
    }
    #[test]
    fn rejects_double_at() {
        let r = validate_address("a@@b.com");
        assert!(!r.ok);
    }
    #[test]
    fn rejects_missing_at_without_panicking() {
        let r = validate_address("bad-address");
        assert!(!r.ok);
        assert!(r.reasons[0].contains("missing '@'"));
    }
    #[test]
    fn local_part_too_long() {
        let local = "a".repeat(65);
        let r = validate_address(&format!("{local}@example.com"));
        assert!(!r.ok);
        assert!(r.reasons.iter().any(|x| x.contains("local part length 65")));
    }
    #[test]
    fn total_length_bound() {
        let label = "a".repeat(60);
        let domain = format!("{label}.{label}.{label}.{label}.com");
        let local = "b".repeat(64);
        let r = validate_address(&format!("{local}@{domain}"));
        assert!(!r.ok);
        assert!(r.reasons.iter().any(|x| x.starts_with("total length")));
    }
    #[test]
    fn quoted_local_accepted() {
        let r = validate_address("\"john doe\"@example.com");
        assert!(r.ok, "{:?}", r.reasons);
    }
}
