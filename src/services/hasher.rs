//! Short code generation
//!
//! The service only depends on [`UrlHasher`]; [`XxHasher`] is the default
//! implementation. Codes are deterministic per (owner, url), so shortening
//! the same URL twice as the same user lands on the same code and surfaces
//! the existing pair as a conflict instead of creating a duplicate.

use xxhash_rust::xxh64::xxh64;

const BASE62: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// 默认短码长度
pub const DEFAULT_CODE_LENGTH: usize = 8;

pub trait UrlHasher: Send + Sync {
    fn hash(&self, owner_id: &str, original_url: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct XxHasher {
    seed: u64,
    length: usize,
}

impl XxHasher {
    pub fn new(seed: u64, length: usize) -> Self {
        // u64 最多 11 位 base62
        Self {
            seed,
            length: length.clamp(1, 11),
        }
    }
}

impl Default for XxHasher {
    fn default() -> Self {
        Self::new(0, DEFAULT_CODE_LENGTH)
    }
}

impl UrlHasher for XxHasher {
    fn hash(&self, owner_id: &str, original_url: &str) -> String {
        let mut input = Vec::with_capacity(owner_id.len() + original_url.len() + 1);
        input.extend_from_slice(owner_id.as_bytes());
        input.push(0);
        input.extend_from_slice(original_url.as_bytes());

        let mut value = xxh64(&input, self.seed);
        let mut code = Vec::with_capacity(self.length);
        for _ in 0..self.length {
            code.push(BASE62[(value % 62) as usize]);
            value /= 62;
        }

        // BASE62 只含 ASCII
        code.into_iter().map(char::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let hasher = XxHasher::default();
        assert_eq!(
            hasher.hash("u1", "https://example.com"),
            hasher.hash("u1", "https://example.com")
        );
    }

    #[test]
    fn test_hash_depends_on_owner_and_url() {
        let hasher = XxHasher::default();
        let base = hasher.hash("u1", "https://example.com");
        assert_ne!(base, hasher.hash("u2", "https://example.com"));
        assert_ne!(base, hasher.hash("u1", "https://example.org"));
    }

    #[test]
    fn test_hash_length_and_alphabet() {
        let hasher = XxHasher::new(7, 6);
        let code = hasher.hash("owner", "https://example.com/a/b?c=d");
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(XxHasher::new(0, 64).hash("o", "u").len(), 11);
    }
}
