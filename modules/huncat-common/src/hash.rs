use sha2::{Digest, Sha256};

/// Stable 24-hex-char digest prefix, used for fallback entity ids when a
/// detail URL has no usable slug. Same input always yields the same id.
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..24].to_string()
}

#[cfg(test)]
mod tests {
    use super::short_hash;

    #[test]
    fn short_hash_is_deterministic() {
        let a = short_hash("mafab:https://www.mafab.hu/movies/x-1.html");
        let b = short_hash("mafab:https://www.mafab.hu/movies/x-1.html");
        assert_eq!(a, b);
        assert_eq!(a.len(), 24);
    }

    #[test]
    fn short_hash_differs_per_input() {
        assert_ne!(short_hash("a"), short_hash("b"));
    }
}
