use crate::shared::validation::{UNSAFE_FILENAME_CHARS, WHITESPACE_RUN};

/// Name used when nothing survives sanitization.
pub const FALLBACK_FILENAME: &str = "file";

/// Byte budget for the sanitized name. The stored name adds a 36-byte uuid
/// and `__`, and must stay under the 255-byte file name limit.
const MAX_FILENAME_BYTES: usize = 200;

/// Reduces an uploaded filename to a single safe path component.
///
/// Directory parts are dropped, unsafe and control characters removed,
/// whitespace runs become `-`, and leading/trailing `.`, `-`, `_` are trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let last = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let stripped = UNSAFE_FILENAME_CHARS.replace_all(last, "");
    let dashed = WHITESPACE_RUN.replace_all(stripped.trim(), "-");

    let cleaned = trim_edges(truncate_bytes(trim_edges(&dashed), MAX_FILENAME_BYTES));

    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c| c == '.' || c == '-' || c == '_')
}

/// Stored file name: the record id keeps names unique inside the shared directory.
pub fn stored_file_name(id: &str, sanitized_name: &str) -> String {
    format!("{}__{}", id, sanitized_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_filename("invoice.pdf"), "invoice.pdf");
        assert_eq!(sanitize_filename("Faktura_2024-01.PDF"), "Faktura_2024-01.PDF");
    }

    #[test]
    fn sanitize_drops_directories() {
        assert_eq!(sanitize_filename("/etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("../../secret.txt"), "secret.txt");
    }

    #[test]
    fn sanitize_removes_unsafe_and_control_characters() {
        assert_eq!(sanitize_filename("re\"port\r\n.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("a<b>c|d.txt"), "abcd.txt");
        assert_eq!(sanitize_filename("nul\0byte.bin"), "nulbyte.bin");
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize_filename("my   holiday photo.jpg"), "my-holiday-photo.jpg");
    }

    #[test]
    fn sanitize_trims_leading_dots() {
        assert_eq!(sanitize_filename(".htaccess"), "htaccess");
        assert_eq!(sanitize_filename("--draft.doc"), "draft.doc");
    }

    #[test]
    fn sanitize_falls_back_when_empty() {
        assert_eq!(sanitize_filename(""), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename(".."), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("dir/"), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("???"), FALLBACK_FILENAME);
    }

    #[test]
    fn sanitize_caps_length() {
        let long = format!("{}.txt", "a".repeat(500));
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_BYTES);
    }

    #[test]
    fn sanitize_caps_multibyte_names_by_bytes() {
        let long = format!("{}.pdf", "zażółć".repeat(25));
        let cleaned = sanitize_filename(&long);

        assert!(cleaned.len() <= MAX_FILENAME_BYTES);
        assert!(long.starts_with(&cleaned));
        assert!(stored_file_name(&uuid::Uuid::new_v4().to_string(), &cleaned).len() <= 255);
    }

    #[test]
    fn sanitize_retrims_after_truncation() {
        let long = format!("{}-{}", "a".repeat(MAX_FILENAME_BYTES - 1), "b".repeat(50));
        assert_eq!(sanitize_filename(&long), "a".repeat(MAX_FILENAME_BYTES - 1));
    }

    #[test]
    fn stored_file_name_prefixes_id() {
        assert_eq!(stored_file_name("a1b2", "x.pdf"), "a1b2__x.pdf");
    }
}
