use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
}

/// Decode raw bytes leniently using: BOM -> encoding hint -> valid UTF-8 -> chardetng guess.
///
/// Malformed sequences become U+FFFD instead of failing the caller.
pub fn decode_text(bytes: &[u8], encoding_hint: Option<&str>) -> DecodedText {
    decode_with(bytes, resolve_encoding(bytes, encoding_hint))
}

/// Pick the encoding [`decode_text`] would use for these bytes.
pub fn resolve_encoding(bytes: &[u8], encoding_hint: Option<&str>) -> &'static Encoding {
    // 1) BOM aware decode using encoding_rs helper
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    // 2) Declared charset
    if let Some(enc) = encoding_hint.and_then(|label| Encoding::for_label(label.trim().as_bytes())) {
        return enc;
    }

    // 3) Plain UTF-8 is the default when it validates
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }

    // 4) chardetng detection over the full document
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Charset parameter of a `Content-Type` header value, if any.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches(['"', '\''].as_ref()).to_string())
            } else {
                None
            }
        })
        .find(|value| !value.is_empty())
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedText {
    let (text, _, _) = enc.decode(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
    }
}
