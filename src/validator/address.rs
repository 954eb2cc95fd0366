use super::types::{AddressError, ParsedAddress};

/// Splits `raw` on its last `@` that is neither quoted nor escaped.
///
/// The domain is converted to its ASCII (punycode) form and lower-cased.
/// Nothing beyond "is this addressable at all" is checked here; the grammar
/// lives in [`validate_syntax`](super::validate_syntax).
pub fn parse_address(raw: &str) -> Result<ParsedAddress, AddressError> {
    let input = raw.trim();
    let at = split_index(input).ok_or(AddressError::MissingAt)?;
    let (local, domain) = (&input[..at], &input[at + 1..]);

    if local.is_empty() {
        return Err(AddressError::EmptyLocalPart);
    }
    if domain.is_empty() {
        return Err(AddressError::EmptyDomain);
    }

    let ascii = normalize_domain(domain)?;
    Ok(ParsedAddress::new(local, ascii))
}

fn split_index(input: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    let mut last = None;
    for (idx, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '@' if !in_quotes => last = Some(idx),
            _ => {}
        }
    }
    last
}

fn normalize_domain(domain: &str) -> Result<String, AddressError> {
    let invalid = || AddressError::InvalidDomain {
        domain: domain.to_string(),
    };
    let ascii = idna::domain_to_ascii(domain).map_err(|_| invalid())?;
    if ascii.is_empty()
        || !ascii
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(invalid());
    }
    Ok(ascii)
}
