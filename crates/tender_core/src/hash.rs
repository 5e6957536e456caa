use sha2::{Digest, Sha256};

/// Computes the hex SHA-256 of a value's canonical JSON form. `serde_json` serializes
/// struct fields in declaration order (not sorted), so the *caller* is responsible for
/// constructing a stable, field-ordered subset — see each normalizer's `hashable()`
/// helper — rather than hashing an arbitrary `serde_json::Value` with unordered map keys.
pub fn hex_sha256_of_json<T: serde::Serialize>(value: &T) -> String {
    let canonical = serde_json::to_vec(value).expect("hashable struct is always serializable");
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Fixture {
        a: &'static str,
        b: Option<i32>,
    }

    #[test]
    fn same_input_same_hash() {
        let x = Fixture { a: "x", b: Some(1) };
        let y = Fixture { a: "x", b: Some(1) };
        assert_eq!(hex_sha256_of_json(&x), hex_sha256_of_json(&y));
    }

    #[test]
    fn different_input_different_hash() {
        let x = Fixture { a: "x", b: Some(1) };
        let y = Fixture { a: "x", b: Some(2) };
        assert_ne!(hex_sha256_of_json(&x), hex_sha256_of_json(&y));
    }
}
