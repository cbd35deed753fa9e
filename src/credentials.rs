//! API credential rotation.
//!
//! Each worker owns one [`CredentialRotator`]. Workers start on different
//! keys (offset by their identity) and move to the next key whenever the
//! active one is exhausted or rejected.

use crate::error::{Result, SozlukError};
use tracing::{info, warn};

/// An ordered set of API keys with a cursor on the active one.
#[derive(Debug, Clone)]
pub struct CredentialRotator {
    keys: Vec<String>,
    index: usize,
}

impl CredentialRotator {
    /// Create a rotator for a worker. The initial key is `worker_id % keys.len()`.
    pub fn new(keys: Vec<String>, worker_id: usize) -> Result<Self> {
        if keys.is_empty() {
            return Err(SozlukError::NoCredentials);
        }

        let mut rotator = Self { keys, index: 0 };
        rotator.activate(worker_id % rotator.keys.len())?;
        Ok(rotator)
    }

    /// Bind the cursor to the key at `index`.
    ///
    /// A malformed key is skipped by rotating to the next one; only when no
    /// key in the set is usable does this return an error.
    pub fn activate(&mut self, index: usize) -> Result<&str> {
        let len = self.keys.len();
        for offset in 0..len {
            let candidate = (index + offset) % len;
            if is_usable(&self.keys[candidate]) {
                self.index = candidate;
                info!(
                    index = candidate,
                    key = %mask(&self.keys[candidate]),
                    "API key active"
                );
                return Ok(&self.keys[candidate]);
            }
            warn!(index = candidate, "API key unusable, rotating");
        }

        Err(SozlukError::NoCredentials)
    }

    /// Advance to the next key, wrapping around, and return the new index.
    pub fn rotate(&mut self) -> usize {
        let next = (self.index + 1) % self.keys.len();
        // The current key is usable, so activation always finds one.
        if self.activate(next).is_err() {
            warn!("no usable API key after rotation, keeping current");
        }
        self.index
    }

    /// The active key.
    pub fn current(&self) -> &str {
        &self.keys[self.index]
    }

    /// Index of the active key.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty. Never true for a constructed rotator.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn is_usable(key: &str) -> bool {
    !key.is_empty() && !key.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Show only the last five characters of a key.
pub fn mask(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(5)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_worker_offset() {
        let set = keys(&["k0", "k1", "k2"]);
        assert_eq!(CredentialRotator::new(set.clone(), 0).unwrap().index(), 0);
        assert_eq!(CredentialRotator::new(set.clone(), 2).unwrap().index(), 2);
        assert_eq!(CredentialRotator::new(set, 4).unwrap().current(), "k1");
    }

    #[test]
    fn test_rotate_wraps() {
        let mut rotator = CredentialRotator::new(keys(&["a", "b", "c"]), 1).unwrap();
        assert_eq!(rotator.rotate(), 2);
        assert_eq!(rotator.rotate(), 0);
        assert_eq!(rotator.current(), "a");
        assert_eq!(rotator.rotate(), 1);
    }

    #[test]
    fn test_single_key_rotates_to_itself() {
        let mut rotator = CredentialRotator::new(keys(&["only"]), 7).unwrap();
        assert_eq!(rotator.rotate(), 0);
        assert_eq!(rotator.current(), "only");
    }

    #[test]
    fn test_activation_skips_bad_keys() {
        let mut rotator = CredentialRotator::new(keys(&["", "good", "bad key"]), 0).unwrap();
        assert_eq!(rotator.index(), 1);

        assert_eq!(rotator.rotate(), 1);
        assert_eq!(rotator.activate(2).unwrap(), "good");
    }

    #[test]
    fn test_no_usable_keys() {
        assert!(matches!(
            CredentialRotator::new(Vec::new(), 0),
            Err(SozlukError::NoCredentials)
        ));
        assert!(matches!(
            CredentialRotator::new(keys(&["", " "]), 0),
            Err(SozlukError::NoCredentials)
        ));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("AIzaSyExample12345"), "...12345");
        assert_eq!(mask("abc"), "...abc");
    }
}
