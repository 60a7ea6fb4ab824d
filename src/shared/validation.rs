use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Characters stripped from uploaded filenames
    /// Covers shell/URL/header specials plus ASCII control characters
    /// - Stripped: `?`, `[`, `]`, `/`, `\`, `=`, `<`, `>`, `:`, `;`, `,`, `'`, `"`, `&`,
    ///   `$`, `#`, `*`, `(`, `)`, `|`, `~`, `` ` ``, `!`, `{`, `}`, `%`, `+`, `^`, control chars
    pub static ref UNSAFE_FILENAME_CHARS: Regex =
        Regex::new(r#"[?\[\]/\\=<>:;,'"&$#*()|~`!{}%+^\x00-\x1f\x7f]"#).unwrap();

    /// Runs of whitespace inside filenames, collapsed to a single dash
    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    /// Attachment ids accepted in download paths
    /// - Valid: "a1b2", "3f2b8c1e-9d4a-4e6b-8f7a-2c1d0e9b8a7f"
    /// - Invalid: "", "a/b", "a b", "../x"
    pub static ref ATTACHMENT_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9\-]{1,64}$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_filename_chars() {
        assert!(UNSAFE_FILENAME_CHARS.is_match("a?b"));
        assert!(UNSAFE_FILENAME_CHARS.is_match("a\"b"));
        assert!(UNSAFE_FILENAME_CHARS.is_match("a\r\nb"));
        assert!(UNSAFE_FILENAME_CHARS.is_match("a\0b"));
        assert!(!UNSAFE_FILENAME_CHARS.is_match("invoice_2024-01.pdf"));
        assert!(!UNSAFE_FILENAME_CHARS.is_match("zdjęcie.png"));
    }

    #[test]
    fn test_attachment_id_regex() {
        assert!(ATTACHMENT_ID_REGEX.is_match("a1b2"));
        assert!(ATTACHMENT_ID_REGEX.is_match("3f2b8c1e-9d4a-4e6b-8f7a-2c1d0e9b8a7f"));
        assert!(!ATTACHMENT_ID_REGEX.is_match(""));
        assert!(!ATTACHMENT_ID_REGEX.is_match("a/b"));
        assert!(!ATTACHMENT_ID_REGEX.is_match("a b"));
        assert!(!ATTACHMENT_ID_REGEX.is_match("../x"));
    }
}
