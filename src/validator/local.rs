/// dot-atom ASCII: atext + '.' non initial/terminal, pas de ".."
pub(crate) fn is_dot_atom(s: &str) -> bool {
    if s.is_empty() || s.starts_with('.') || s.ends_with('.') || s.contains("..") {
        return false;
    }
    s.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '!' | '#'
                    | '$'
                    | '%'
                    | '&'
                    | '\''
                    | '*'
                    | '+'
                    | '-'
                    | '/'
                    | '='
                    | '?'
                    | '^'
                    | '_'
                    | '`'
                    | '{'
                    | '|'
                    | '}'
                    | '~'
                    | '.'
            )
    })
}

/// quoted-string ASCII: `"` ... `"`, caractères imprimables,
/// `"` et `\` uniquement échappés.
pub(crate) fn is_quoted_string(s: &str) -> bool {
    if s.len() < 2 || !s.starts_with('"') || !s.ends_with('"') {
        return false;
    }
    let inner = &s[1..s.len() - 1];
    let mut escaped = false;
    for c in inner.chars() {
        if !(' '..='~').contains(&c) {
            return false;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return false,
            _ => {}
        }
    }
    !escaped
}

pub(crate) fn is_local_valid(s: &str) -> bool {
    is_dot_atom(s) || is_quoted_string(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn strict_dots() {
        assert!(!is_dot_atom(".abc"));
        assert!(!is_dot_atom("abc."));
        assert!(!is_dot_atom("a..b"));
        assert!(is_dot_atom("a.b"));
        assert!(is_dot_atom("first.last+tag"));
    }
    #[test]
    fn rejects_non_ascii_and_specials() {
        assert!(!is_dot_atom("péché"));
        assert!(!is_dot_atom("a b"));
        assert!(!is_dot_atom("a@b"));
    }
    #[test]
    fn quoted() {
        assert!(is_quoted_string("\"a b\""));
        assert!(is_quoted_string("\"a\\\"b\""));
        assert!(!is_quoted_string("\"a\"b\""));
        assert!(!is_quoted_string("\"trailing\\\""));
        assert!(is_local_valid("\"john doe\""));
    }
}
