//! Access gate for reading a space.
//!
//! Passcodes are never stored in plain text; the store keeps a SHA-256 digest and
//! the gate compares digests in constant time. Two passcodes pass the gate exactly
//! when they are the same string.

use sha2::{Digest, Sha256};

use crate::space::Space;

/// Digest a passcode for storage or comparison (lowercase hex).
pub fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Whether a requester holding `supplied` may read the contents of `space`.
///
/// Public spaces are always readable, whatever was supplied.
pub fn can_read(space: &Space, supplied: Option<&str>) -> bool {
    if space.is_public {
        return true;
    }
    matches_secret(space, supplied)
}

/// Check a passcode against the stored secret without the public bypass.
///
/// Callers should only use this on private spaces; a space without a stored
/// secret never matches.
pub fn is_passcode_correct(space: &Space, supplied: Option<&str>) -> bool {
    matches_secret(space, supplied)
}

fn matches_secret(space: &Space, supplied: Option<&str>) -> bool {
    let (Some(stored), Some(supplied)) = (space.secret_hash.as_deref(), supplied) else {
        return false;
    };
    if stored.is_empty() {
        return false;
    }
    constant_time_eq(stored, &hash_secret(supplied))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private_space(secret: &str) -> Space {
        let mut space = Space::with_defaults("priv");
        space.set_privacy(false, Some(secret)).unwrap();
        space
    }

    #[test]
    fn test_public_always_readable() {
        let space = Space::with_defaults("demo");
        assert!(can_read(&space, None));
        assert!(can_read(&space, Some("")));
        assert!(can_read(&space, Some("anything")));
    }

    #[test]
    fn test_public_with_stale_secret_ignores_it() {
        let mut space = private_space("xyz");
        space.is_public = true;
        assert!(can_read(&space, Some("wrong")));
        assert!(can_read(&space, None));
    }

    #[test]
    fn test_private_requires_exact_match() {
        let space = private_space("xyz");
        assert!(can_read(&space, Some("xyz")));
        assert!(!can_read(&space, Some("abc")));
        assert!(!can_read(&space, Some("XYZ")));
        assert!(!can_read(&space, Some("xyz ")));
        assert!(!can_read(&space, Some("")));
        assert!(!can_read(&space, None));
    }

    #[test]
    fn test_passcode_check_has_no_public_bypass() {
        let space = Space::with_defaults("demo");
        assert!(!is_passcode_correct(&space, Some("")));
        assert!(!is_passcode_correct(&space, None));

        let space = private_space("xyz");
        assert!(is_passcode_correct(&space, Some("xyz")));
        assert!(!is_passcode_correct(&space, Some("abc")));
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_secret("xyz");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_secret("xyz"));
        assert_ne!(hash, hash_secret("xyz!"));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
