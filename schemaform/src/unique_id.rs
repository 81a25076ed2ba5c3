//! Process-wide unique id generation.
//!
//! Ids come from a single monotonic counter, so they are sequential rather
//! than random: two calls never return the same string within one process,
//! and fixtures can match ids by prefix.

use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Return a fresh id, `"prefix-N"` when a non-empty prefix is given, `"N"`
/// otherwise.
pub fn unique_id(prefix: Option<&str>) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}-{n}"),
        _ => n.to_string(),
    }
}

/// Encode a property key for use as one segment of a derived DOM id.
///
/// Characters other than ASCII alphanumerics, `_`, `.` and `:` become
/// `%XX` per UTF-8 byte. A segment never contains the `-` that joins
/// segments, so `{parent}-{segment}` ids stay distinct.
pub fn id_segment(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'.' | b':' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_segment() {
        assert_eq!(id_segment("city"), "city");
        assert_eq!(id_segment("a-b"), "a%2Db");
        assert_eq!(id_segment("50%"), "50%25");
        assert_eq!(id_segment("first name"), "first%20name");
        assert_eq!(id_segment("é"), "%C3%A9");
        assert!(!id_segment("-a--b-").contains('-'));
    }

    #[test]
    fn test_prefix() {
        let id = unique_id(Some("name"));
        assert!(id.starts_with("name-"));
        assert!(id["name-".len()..].parse::<u64>().is_ok());

        let bare = unique_id(None);
        assert!(bare.parse::<u64>().is_ok());
        assert!(unique_id(Some("")).parse::<u64>().is_ok());
    }

    #[test]
    fn test_never_repeats() {
        let ids: std::collections::HashSet<_> = (0..64).map(|_| unique_id(Some("x"))).collect();
        assert_eq!(ids.len(), 64);
    }
}
