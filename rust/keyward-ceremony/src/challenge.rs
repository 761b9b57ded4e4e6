use keyward_credentials::CeremonyType;
use keyward_encoding::base64url;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{Duration, SystemTime},
};

/// Number of random bytes in a challenge.
pub const CHALLENGE_LEN: usize = 32;

/// A random, single-use WebAuthn challenge in its base64url form.
///
/// `Debug` is redacted so a challenge never ends up in logs by accident.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Challenge(String);

impl Challenge {
    /// Draw [`CHALLENGE_LEN`] bytes from `rng`.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; CHALLENGE_LEN];
        rng.fill_bytes(&mut bytes);
        Challenge(base64url::encode(bytes))
    }

    /// The base64url text, exactly as sent to the client.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Challenge(..)")
    }
}

impl AsRef<str> for Challenge {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A challenge waiting for the response that consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCeremony {
    /// The user the challenge was issued to.
    pub username: String,
    /// Which ceremony the challenge belongs to.
    pub ceremony: CeremonyType,
    /// The challenge.
    pub challenge: Challenge,
    /// When the challenge was issued.
    pub issued_at: SystemTime,
}

impl PendingCeremony {
    /// Whether the challenge is older than `timeout` at `now`.
    pub fn is_expired(&self, now: SystemTime, timeout: Duration) -> bool {
        match now.duration_since(self.issued_at) {
            Ok(age) => age > timeout,
            // Issued in the future: the clock moved backwards.
            Err(_) => false,
        }
    }
}
