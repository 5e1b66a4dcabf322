//! Session ids of long-polling transports.
//!
//! Requests of a polling session look like
//! `/socket.io/<version>/<transport>/<session-id>[?query]`. The id is read as
//! a little-endian number in the base64 alphabet:
//!
//! ```text
//! value = Σ digit(c_i) · 64^i      digit: A–Z → 0–25, a–z → 26–51, 0–9 → 52–61, + → 62, / → 63
//! ```
//!
//! Characters outside the alphabet count as digit 0.

use std::sync::LazyLock;

use regex::Regex;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

static SESSION_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/socket\.io/[^/]*/(?:xhr-polling|htmlfile|jsonp-polling)/([^/?]+)")
        .expect("session path pattern is valid")
});

/// Extracts the session id from a request path, if it is a polling request.
pub fn session_id(path: &str) -> Option<&str> {
    SESSION_PATH
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn digit(c: u8) -> u64 {
    ALPHABET.iter().position(|&a| a == c).unwrap_or(0) as u64
}

/// Full numeric value of `id`, or `None` if it does not fit in 128 bits.
pub fn decode(id: &str) -> Option<u128> {
    id.bytes().rev().try_fold(0u128, |value, c| {
        value.checked_mul(64)?.checked_add(u128::from(digit(c)))
    })
}

/// `decode(id) mod modulus`, exact for ids of any length (`0` when `modulus == 0`).
pub fn bucket(id: &str, modulus: usize) -> usize {
    if modulus == 0 {
        return 0;
    }
    let m = modulus as u128;
    let mut acc: u128 = 0;
    let mut weight: u128 = 1 % m;
    for c in id.bytes() {
        acc = (acc + u128::from(digit(c)) * weight) % m;
        weight = (weight * 64) % m;
    }
    acc as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_extraction() {
        assert_eq!(
            session_id("/socket.io/1/xhr-polling/BAAA?t=1234"),
            Some("BAAA")
        );
        assert_eq!(session_id("/socket.io/1/jsonp-polling/xyz/"), Some("xyz"));
        assert_eq!(session_id("/socket.io/1/htmlfile/q9"), Some("q9"));
        assert_eq!(session_id("/socket.io/1/websocket/abc"), None);
        assert_eq!(session_id("/socket.io/1/xhr-polling/"), None);
        assert_eq!(session_id("/static/app.js"), None);
    }

    #[test]
    fn test_decode_little_endian() {
        assert_eq!(decode("A"), Some(0));
        assert_eq!(decode("B"), Some(1));
        assert_eq!(decode("/"), Some(63));
        assert_eq!(decode("AB"), Some(64));
        assert_eq!(decode("BB"), Some(65));
        assert_eq!(decode("ba"), Some(27 + 26 * 64));
    }

    #[test]
    fn test_unknown_characters_count_as_zero() {
        assert_eq!(decode("-B"), decode("AB"));
        assert_eq!(bucket("-B", 5), bucket("AB", 5));
    }

    #[test]
    fn test_bucket_matches_decode() {
        for id in ["A", "Zz", "hello", "q9+/x", "8Jc2bZk"] {
            let value = decode(id).unwrap();
            for len in 1..=7 {
                assert_eq!(bucket(id, len) as u128, value % len as u128, "id={id} len={len}");
            }
        }
    }

    #[test]
    fn test_bucket_of_long_ids() {
        let id = "x".repeat(100);
        assert_eq!(decode(&id), None);
        assert!(bucket(&id, 3) < 3);
        assert_eq!(bucket(&id, 1), 0);
        assert_eq!(bucket(&id, 0), 0);
    }
}
