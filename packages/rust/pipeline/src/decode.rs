//! Charset-aware byte-to-text decoding for fetched pages.
//!
//! Resolution order: BOM -> declared charset -> chardetng detection.
//! Malformed sequences decode lossily (replacement characters) — a crawled
//! page with a little mojibake is still worth indexing.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Decode raw page bytes into a UTF-8 string.
///
/// `declared` is the charset label the transport reported (Content-Type
/// parameter), if any.
pub fn decode_bytes(bytes: &[u8], declared: Option<&str>) -> String {
    let encoding = detect_encoding(bytes, declared);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = encoding.name(), "lossy decode of page bytes");
    }
    text.into_owned()
}

fn detect_encoding(bytes: &[u8], declared: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if let Some(label) = declared {
        if let Some(encoding) = Encoding::for_label(label.trim().as_bytes()) {
            return encoding;
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Extract the `charset=` parameter from a Content-Type header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|part| {
            let part = part.trim();
            part.split_once('=').and_then(|(key, value)| {
                key.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| value.trim().trim_matches(['"', '\'']).to_string())
            })
        })
        .next()
}

/// The MIME type of a Content-Type header value, parameters stripped.
pub fn mime_from_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        let text = "héllo wörld — ドキュメント";
        assert_eq!(decode_bytes(text.as_bytes(), Some("utf-8")), text);
    }

    #[test]
    fn bom_wins_over_declared_charset() {
        // UTF-16LE BOM followed by "hi"
        let bytes = [0xFF, 0xFE, b'h', 0x00, b'i', 0x00];
        assert_eq!(decode_bytes(&bytes, Some("iso-8859-1")), "hi");
    }

    #[test]
    fn declared_latin1_decodes() {
        // "café" in ISO-8859-1
        let bytes = [b'c', b'a', b'f', 0xE9];
        assert_eq!(decode_bytes(&bytes, Some("iso-8859-1")), "café");
    }

    #[test]
    fn unknown_label_falls_back_to_detection() {
        let text = "plain ascii content";
        assert_eq!(decode_bytes(text.as_bytes(), Some("not-a-charset")), text);
    }

    #[test]
    fn detection_without_declaration() {
        let text = "Übung macht den Meister";
        let bytes = encoding_rs::WINDOWS_1252.encode(text).0;
        assert_eq!(decode_bytes(&bytes, None), text);
    }

    #[test]
    fn charset_parameter_extraction() {
        assert_eq!(
            charset_from_content_type("text/html; charset=utf-8"),
            Some("utf-8".into())
        );
        assert_eq!(
            charset_from_content_type("text/html; Charset=\"ISO-8859-1\""),
            Some("ISO-8859-1".into())
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn mime_extraction_strips_parameters() {
        assert_eq!(
            mime_from_content_type("Text/HTML; charset=utf-8"),
            "text/html"
        );
        assert_eq!(mime_from_content_type("application/json"), "application/json");
    }
}
