//! Challenge, origin and relying-party checks.
//!
//! Everything here runs before a signature is looked at.

use crate::{CeremonyType, ClientData, PolicyViolation};
use keyward_encoding::AuthenticatorFlags;
use sha2::{Digest, Sha256};

/// The only credential type WebAuthn defines.
pub const PUBLIC_KEY_CREDENTIAL_TYPE: &str = "public-key";

/// What the client data of one ceremony must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientDataPolicy<'a> {
    /// Expected `clientData.type`.
    pub ceremony: CeremonyType,
    /// The base64url challenge issued for this ceremony.
    pub challenge: &'a str,
    /// The relying-party origin, scheme, host and port.
    pub origin: &'a str,
}

impl ClientDataPolicy<'_> {
    /// Check type, challenge and origin, in that order.
    ///
    /// The challenge is compared as text so that a re-encoded or padded
    /// challenge does not pass for the issued one.
    ///
    /// # Errors
    ///
    /// Returns the [`PolicyViolation`] of the first check that fails.
    pub fn check(&self, client_data: &ClientData) -> Result<(), PolicyViolation> {
        if client_data.ceremony != self.ceremony.as_str() {
            return Err(PolicyViolation::CeremonyTypeMismatch {
                expected: self.ceremony.as_str(),
                actual: client_data.ceremony.clone(),
            });
        }
        if client_data.challenge != self.challenge {
            return Err(PolicyViolation::ChallengeMismatch);
        }
        if client_data.origin != self.origin {
            return Err(PolicyViolation::OriginMismatch {
                expected: self.origin.to_string(),
                actual: client_data.origin.clone(),
            });
        }
        Ok(())
    }
}

/// The posted `PublicKeyCredential.type` must be `public-key`.
pub fn check_credential_type(credential_type: &str) -> Result<(), PolicyViolation> {
    if credential_type == PUBLIC_KEY_CREDENTIAL_TYPE {
        Ok(())
    } else {
        Err(PolicyViolation::UnsupportedCredentialType(
            credential_type.to_string(),
        ))
    }
}

/// The authenticator data must have been produced for `rp_id`.
pub fn check_rp_id_hash(rp_id_hash: &[u8; 32], rp_id: &str) -> Result<(), PolicyViolation> {
    if Sha256::digest(rp_id.as_bytes()).as_slice() == rp_id_hash {
        Ok(())
    } else {
        Err(PolicyViolation::RpIdHashMismatch)
    }
}

/// The user-present bit must be set.
pub fn check_user_present(flags: AuthenticatorFlags) -> Result<(), PolicyViolation> {
    if flags.user_present() {
        Ok(())
    } else {
        Err(PolicyViolation::UserNotPresent)
    }
}
