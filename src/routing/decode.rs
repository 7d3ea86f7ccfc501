// Percent-decoding of request paths before rule matching

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Decode `%XX` escapes in a request path.
///
/// Malformed escapes are kept as-is. Byte sequences that are not valid UTF-8
/// after decoding are replaced with U+FFFD.
pub fn percent_decode(path: &str) -> Cow<'_, str> {
    percent_decode_str(path).decode_utf8_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path_is_borrowed() {
        assert!(matches!(percent_decode("/add/2/3"), Cow::Borrowed("/add/2/3")));
    }

    #[test]
    fn test_decodes_escapes() {
        assert_eq!(percent_decode("/add/%32/3"), "/add/2/3");
        assert_eq!(percent_decode("/a%2Fb"), "/a/b");
        assert_eq!(percent_decode("/caf%C3%A9"), "/café");
    }

    #[test]
    fn test_keeps_malformed_escapes() {
        assert_eq!(percent_decode("/100%"), "/100%");
        assert_eq!(percent_decode("/%zz"), "/%zz");
        assert_eq!(percent_decode("/%4"), "/%4");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        assert_eq!(percent_decode("/%FF"), "/\u{FFFD}");
    }
}
