//! Content hashing using xxHash3.
//!
//! Behavior scripts are addressed by the hash of their body, so two
//! definitions carrying the same script text resolve to the same module id.

use xxhash_rust::xxh3::xxh3_64;

/// Scheme prefix for content-addressed script modules.
pub const MODULE_SCHEME: &str = "easel-script";

/// Compute a 64-bit hash of the given string using xxHash3.
#[inline]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

/// Convert a hash to a hex string (16 characters).
#[inline]
pub fn hash_to_hex(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Module id for a script body, e.g. `easel-script:1f0c…`.
pub fn module_id(body: &str) -> String {
    format!("{}:{}", MODULE_SCHEME, hash_to_hex(hash_str(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        assert_eq!(hash_str("export default x"), hash_str("export default x"));
    }

    #[test]
    fn test_hash_difference() {
        assert_ne!(hash_str("Hello"), hash_str("World"));
    }

    #[test]
    fn test_hex_format() {
        let hex = hash_to_hex(hash_str("test"));
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_module_id() {
        let id = module_id("console.log(1)");
        assert!(id.starts_with("easel-script:"));
        assert_eq!(id.len(), MODULE_SCHEME.len() + 1 + 16);
        assert_eq!(id, module_id("console.log(1)"));
    }
}
