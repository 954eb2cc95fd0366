/// Valide le domaine (déjà en ASCII): longueur + checks de labels.
/// Push des raisons invalidantes dans `reasons`.
pub(crate) fn check_domain(domain_ascii: &str, reasons: &mut Vec<String>) {
    if domain_ascii.is_empty() {
        reasons.push("domain empty".to_string());
        return;
    }

    if domain_ascii.len() > 253 {
        reasons.push(format!("domain length {} > 253", domain_ascii.len()));
    }

    // au moins un point
    if !domain_ascii.contains('.') {
        reasons.push("domain must contain at least one dot".to_string());
    }

    for label in domain_ascii.split('.') {
        if label.is_empty() {
            reasons.push("empty domain label".to_string());
            continue;
        }
        if label.len() > 63 {
            reasons.push(format!(
                "domain label '{}' length {} > 63",
                label,
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            reasons.push(format!(
                "domain label '{}' cannot start/end with '-'",
                label
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            reasons.push(format!("domain label '{}' has invalid chars", label));
        }
    }

    // TLD purement numérique => probablement une IP, pas un domaine
    if let Some(tld) = domain_ascii.rsplit('.').next() {
        if !tld.is_empty() && tld.chars().all(|c| c.is_ascii_digit()) {
            reasons.push(format!("top-level label '{tld}' is numeric"));
        }
    }
}
