#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![deny(elided_lifetimes_in_paths)]
#![allow(clippy::assertions_on_constants)]
#![allow(clippy::type_complexity)]

use std::borrow::Cow;

//=================================================================================================|

/// Truncates text to the specified length, as necessary.
///
/// Any truncated text is replaced by `"[...]"`.
///
/// - `s` - The text to be truncated.
/// - `max_chars` - The maximum length of the resulting text.
pub fn truncate_text(s: Cow<'_, str>, max_chars: usize) -> Cow<'_, str> {
    static CHARS: &str = "[...]";
    static CHARS_QTY: usize = 5;

    let max_chars = max_chars.max(CHARS_QTY);

    let s_len = s.chars().take(max_chars.saturating_add(1)).count();

    if s_len <= max_chars {
        s
    } else {
        let mut s: String = s.chars().take(max_chars - CHARS_QTY).collect();
        s.push_str(CHARS);
        s.into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod t {
    use super::*;

    fn t<'a, S: Into<Cow<'a, str>>>(s: S, max_chars: usize) -> Cow<'a, str> {
        let s: Cow<'a, str> = s.into();
        truncate_text(s, max_chars)
    }

    #[test_log::test]
    fn short_strings_pass_through_unchanged() {
        assert_eq!(t("", 0), "");
        assert_eq!(t("1", 0), "1");
        assert_eq!(t("1234", 6), "1234");
        assert_eq!(t("12345", 5), "12345");
    }

    #[test_log::test]
    fn longer_strings_are_truncated_with_ellipsis_marker() {
        assert_eq!(t("123456", 4), "[...]");
        assert_eq!(t("123456", 6), "123456");
        assert_eq!(t("1234567", 6), "1[...]");
        assert_eq!(t("1234567", 7), "1234567");
    }
}
