//! NUL-escaping and composite key construction.

/// The escape sequence substituted for an embedded NUL byte: unit-separator,
/// '0', unit-separator.
const NUL_ESCAPE: &str = "\u{1F}0\u{1F}";

/// Escape embedded NUL bytes and trim surrounding whitespace.
pub fn sanitize(s: &str) -> String {
    s.trim().replace('\0', NUL_ESCAPE)
}

/// Inverse of [`sanitize`]'s NUL-escaping (trimming is not reversible and
/// isn't reversed here).
pub fn desanitize(s: &str) -> String {
    s.replace(NUL_ESCAPE, "\0")
}

/// Lowercase and sanitize each part, then join with the single NUL-byte
/// delimiter used for composite keys.
pub fn make_key(parts: &[&str]) -> Vec<u8> {
    let joined = parts
        .iter()
        .map(|p| sanitize(&p.to_lowercase()))
        .collect::<Vec<_>>()
        .join("\u{0}");
    joined.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_escapes_embedded_nul() {
        let s = sanitize("foo\0bar");
        assert!(!s.contains('\0'));
        assert_eq!(desanitize(&s), "foo\0bar");
    }

    #[test]
    fn desanitize_reverses_sanitize_for_arbitrary_text() {
        for input in ["plain", "has\0nul", "multi\0ple\0nuls", ""] {
            let round = desanitize(&sanitize(input));
            assert_eq!(round, input.trim());
        }
    }

    #[test]
    fn composite_key_uses_single_nul_delimiter() {
        let key = make_key(&["Quick", "Brown"]);
        assert_eq!(key, b"quick\x00brown".to_vec());
    }

    #[test]
    fn sanitized_parts_never_contain_delimiter_byte() {
        let key = make_key(&["has\0nul", "other"]);
        // Exactly one NUL byte (the delimiter) should remain.
        assert_eq!(key.iter().filter(|&&b| b == 0).count(), 1);
    }
}
