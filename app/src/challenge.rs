//! Mints single-use `k1` challenge tokens (§4.G). Collisions are treated as impossible: 32 bytes
//! of CSPRNG output gives a collision probability below 2⁻¹²⁸.

use rand::RngCore;

/// Returns a 64-char lowercase hex string derived from 32 random bytes.
pub fn random_k1() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_64_char_lowercase_hex() {
        let k1 = random_k1();
        assert_eq!(k1.len(), 64);
        assert!(k1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn two_calls_differ() {
        assert_ne!(random_k1(), random_k1());
    }
}
