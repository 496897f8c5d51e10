//! Request path decoding and encoding
//!
//! Decoding is strict: a `%` not followed by two hex digits, or bytes that are
//! not UTF-8, fail the request instead of being passed through.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{Error, Result};

/// Characters escaped when a path goes back out in a URL (`/` kept)
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in a single path segment
const SEGMENT: &AsciiSet = &PATH.add(b'/');

/// Percent-decode a URI path
pub fn decode_request_path(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    for (position, _) in raw.match_indices('%') {
        let well_formed = bytes
            .get(position + 1..position + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Err(Error::MalformedEscape {
                path: raw.to_string(),
                position,
            });
        }
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| Error::InvalidUtf8(raw.to_string()))
}

/// Encode a decoded path for use in a `Location` header or link
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// Encode a single file name for use as a relative link
pub fn encode_segment(name: &str) -> String {
    utf8_percent_encode(name, SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_and_escaped() {
        assert_eq!(decode_request_path("/Build/game.wasm").unwrap(), "/Build/game.wasm");
        assert_eq!(decode_request_path("/my%20game.data").unwrap(), "/my game.data");
        assert_eq!(decode_request_path("/caf%C3%A9.js").unwrap(), "/café.js");
        assert_eq!(decode_request_path("/a%2eb").unwrap(), "/a.b");
    }

    #[test]
    fn test_decode_rejects_malformed_escape() {
        assert!(matches!(
            decode_request_path("/bad%zz.js"),
            Err(Error::MalformedEscape { position: 4, .. })
        ));
        assert!(matches!(
            decode_request_path("/trailing%2"),
            Err(Error::MalformedEscape { .. })
        ));
        assert!(matches!(
            decode_request_path("/end%"),
            Err(Error::MalformedEscape { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(matches!(
            decode_request_path("/%FF%FE"),
            Err(Error::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_path("/my game/a#1.js"), "/my%20game/a%231.js");
        assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
        assert_eq!(encode_path("/café/"), "/caf%C3%A9/");
    }
}
