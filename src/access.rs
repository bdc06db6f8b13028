use sha2::{Digest, Sha256};

// @module: Shared passphrase gate for submission controls

/// A single shared passphrase; not per-user authentication
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    // @field: SHA-256 of the passphrase, `None` leaves the gate open
    digest: Option<[u8; 32]>,
}

impl AccessGate {
    pub fn new(passphrase: Option<&str>) -> Self {
        let digest = passphrase
            .filter(|p| !p.is_empty())
            .map(|p| Sha256::digest(p.as_bytes()).into());
        Self { digest }
    }

    /// Gate that never locks
    pub fn open() -> Self {
        Self { digest: None }
    }

    pub fn is_open(&self) -> bool {
        self.digest.is_none()
    }

    // @returns: Whether the attempt unlocks submission
    pub fn unlock(&self, attempt: Option<&str>) -> bool {
        match (&self.digest, attempt) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(expected), Some(attempt)) => {
                let actual: [u8; 32] = Sha256::digest(attempt.as_bytes()).into();
                // Compare every byte regardless of where the first mismatch is.
                expected.iter().zip(actual.iter()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
            }
        }
    }
}
