//! Lexicographic prefix comparison.
//!
//! Callers that keep one search view per query string use this to decide
//! whether a newly entered query is an extension of one they already have a
//! view for, and in which direction it diverges otherwise.

use std::cmp::Ordering;

/// Compare `prefix` against the leading bytes of `text`.
///
/// Returns [`Ordering::Equal`] when `prefix` is fully contained at the start
/// of `text`, the ordering of the first differing byte otherwise, and
/// [`Ordering::Greater`] when all compared bytes agree but `prefix` is the
/// longer of the two.
///
/// The comparison is byte-wise and case-sensitive. UTF-8 byte order agrees
/// with code point order, so `&str` arguments compare consistently with
/// their character sequences.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use pagelog::compare_prefix;
///
/// assert_eq!(compare_prefix("ab", "abc"), Ordering::Equal);
/// assert_eq!(compare_prefix("abc", "ab"), Ordering::Greater);
/// assert_eq!(compare_prefix("abb", "abc"), Ordering::Less);
/// ```
pub fn compare_prefix(prefix: &str, text: &str) -> Ordering {
    let p = prefix.as_bytes();
    let t = text.as_bytes();
    for (a, b) in p.iter().zip(t.iter()) {
        match a.cmp(b) {
            Ordering::Equal => continue,
            diverged => return diverged,
        }
    }
    if p.len() > t.len() {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contained_prefix_is_equal() {
        assert_eq!(compare_prefix("ab", "abc"), Ordering::Equal);
        assert_eq!(compare_prefix("abc", "abc"), Ordering::Equal);
    }

    #[test]
    fn test_longer_prefix_is_greater() {
        assert_eq!(compare_prefix("abc", "ab"), Ordering::Greater);
        assert_eq!(compare_prefix("a", ""), Ordering::Greater);
    }

    #[test]
    fn test_first_differing_byte_decides() {
        assert_eq!(compare_prefix("abd", "abc"), Ordering::Greater);
        assert_eq!(compare_prefix("abb", "abc"), Ordering::Less);
        assert_eq!(compare_prefix("b", "alpha"), Ordering::Greater);
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        assert_eq!(compare_prefix("", ""), Ordering::Equal);
        assert_eq!(compare_prefix("", "anything"), Ordering::Equal);
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        assert_eq!(compare_prefix("A", "a"), Ordering::Less);
    }

    #[test]
    fn test_multibyte_sequences_compare_bytewise() {
        assert_eq!(compare_prefix("é", "été"), Ordering::Equal);
        assert_eq!(compare_prefix("été", "é"), Ordering::Greater);
    }
}
