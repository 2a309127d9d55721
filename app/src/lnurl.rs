//! LNURL's bech32 wire encoding (§4.H). A callback URL is never interpreted, only carried: these
//! two functions are the entire contract.

use bech32::{FromBase32, ToBase32, Variant};

const HRP: &str = "lnurl";

/// Encodes `url` as a bech32 LNURL string with the upper-case `LNURL1...` prefix used on the
/// wire (§4.G, §8 scenario S1).
pub fn encode(url: &str) -> String {
    let data = url.as_bytes().to_base32();
    bech32::encode(HRP, data, Variant::Bech32)
        .unwrap()
        .to_uppercase()
}

/// Decodes a bech32 LNURL string back into the URL it carries. Returns `None` for anything that
/// isn't a well-formed `lnurl` HRP bech32 string, mixed-case input included (bech32 requires a
/// single case throughout).
pub fn decode(encoded: &str) -> Option<String> {
    let (hrp, data, variant) = bech32::decode(encoded).ok()?;
    if hrp != HRP || variant != Variant::Bech32 {
        return None;
    }
    let bytes = Vec::<u8>::from_base32(&data).ok()?;
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_and_decode() {
        let url = "https://fancy.domain/withdraw/ln/cb?k1=abc123";
        let encoded = encode(url);
        assert!(encoded.starts_with("LNURL1"));
        assert_eq!(decode(&encoded).unwrap(), url);
    }

    #[test]
    fn decode_accepts_lowercase_wire_form() {
        let url = "https://fancy.domain/x";
        let encoded = encode(url).to_lowercase();
        assert_eq!(decode(&encoded).unwrap(), url);
    }

    #[test]
    fn decode_rejects_mismatched_hrp() {
        let other = bech32::encode("lnurlx", "hi".as_bytes().to_base32(), Variant::Bech32).unwrap();
        assert!(decode(&other).is_none());
    }
}
