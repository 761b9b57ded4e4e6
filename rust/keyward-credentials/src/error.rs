//! Error types for credential verification.

use keyward_encoding::ParseError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A relying-party policy was not met.
///
/// Policy violations are detected before any signature is checked, so a
/// request that breaks policy never reveals whether its signature was valid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    /// The posted credential is not a `public-key` credential.
    #[error("unsupported credential type {0:?}")]
    UnsupportedCredentialType(String),

    /// `clientData.type` names the wrong ceremony.
    #[error("client data type {actual:?} does not match {expected:?}")]
    CeremonyTypeMismatch {
        /// The type this ceremony requires.
        expected: &'static str,
        /// The type the client reported.
        actual: String,
    },

    /// `clientData.challenge` is not the challenge issued for this ceremony.
    #[error("challenge mismatch")]
    ChallengeMismatch,

    /// The issued challenge outlived its timeout.
    #[error("challenge expired")]
    ChallengeExpired,

    /// No challenge is pending for this ceremony.
    #[error("no pending challenge")]
    NoPendingChallenge,

    /// `clientData.origin` is not the configured relying-party origin.
    #[error("origin {actual:?} does not match {expected:?}")]
    OriginMismatch {
        /// Configured origin.
        expected: String,
        /// Origin reported by the client.
        actual: String,
    },

    /// The authenticator data was produced for another relying party.
    #[error("rpIdHash does not match the relying party")]
    RpIdHashMismatch,

    /// The user-present flag is clear.
    #[error("user presence flag not set")]
    UserNotPresent,

    /// The attestation statement format is not one we verify.
    #[error("unsupported attestation format {0:?}")]
    UnsupportedFormat(String),

    /// A COSE algorithm we do not accept.
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(i64),

    /// A COSE key type we do not accept.
    #[error("unsupported key type {0}")]
    UnsupportedKeyType(i64),

    /// A COSE curve we do not accept.
    #[error("unsupported curve {0}")]
    UnsupportedCurve(i64),

    /// `none` attestation is disabled by configuration.
    #[error("none attestation is not accepted")]
    NoneAttestationRejected,

    /// The attestation certificate does not meet the packed certificate
    /// requirements.
    #[error("attestation certificate: {0}")]
    Certificate(#[from] CertificateViolation),
}

/// Reasons a packed attestation certificate is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateViolation {
    /// Not an X.509 version 3 certificate.
    #[error("version must be 3, got {0}")]
    Version(u32),

    /// Basic constraints mark the certificate as a CA.
    #[error("certificate must not be a CA")]
    CertificateAuthority,

    /// Subject C is missing or not an ISO 3166-1 alpha-2 code.
    #[error("invalid subject country {0:?}")]
    Country(Option<String>),

    /// Subject O is missing.
    #[error("missing subject organization")]
    MissingOrganization,

    /// Subject OU is not `Authenticator Attestation`.
    #[error("invalid subject organizational unit {0:?}")]
    OrganizationalUnit(Option<String>),

    /// Subject CN is missing.
    #[error("missing subject common name")]
    MissingCommonName,

    /// The AAGUID extension is marked critical.
    #[error("AAGUID extension must not be critical")]
    CriticalAaguidExtension,

    /// The AAGUID extension is not a 16 byte OCTET STRING.
    #[error("malformed AAGUID extension")]
    MalformedAaguidExtension,

    /// The AAGUID extension disagrees with the authenticator data.
    #[error("AAGUID extension does not match authenticator data")]
    AaguidMismatch,
}

/// The failure category of a verification, independent of its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed binary, CBOR, JSON or PEM input.
    #[serde(rename = "ParseError")]
    Parse,
    /// A relying-party policy check failed.
    #[serde(rename = "PolicyError")]
    Policy,
    /// The signature counter did not increase.
    #[serde(rename = "ReplayError")]
    Replay,
    /// The credential is unknown.
    #[serde(rename = "NotFoundError")]
    NotFound,
    /// Input was well formed but a signature did not verify.
    CryptoVerificationFailure,
}

/// Errors from attestation and assertion verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// Input could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A policy check failed.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// The assertion counter did not strictly increase.
    #[error("signature counter {received} does not exceed stored counter {stored}")]
    Replay {
        /// Counter held in the authenticator record.
        stored: u32,
        /// Counter carried by the assertion.
        received: u32,
    },

    /// No authenticator record exists for the credential.
    #[error("unknown credential {credential_id}")]
    NotFound {
        /// base64url credential id.
        credential_id: String,
    },

    /// The signature does not verify.
    #[error("signature verification failed")]
    SignatureInvalid,
}

impl VerificationError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerificationError::Parse(_) => ErrorKind::Parse,
            VerificationError::Policy(_) => ErrorKind::Policy,
            VerificationError::Replay { .. } => ErrorKind::Replay,
            VerificationError::NotFound { .. } => ErrorKind::NotFound,
            VerificationError::SignatureInvalid => ErrorKind::CryptoVerificationFailure,
        }
    }
}

impl From<CertificateViolation> for VerificationError {
    fn from(value: CertificateViolation) -> Self {
        VerificationError::Policy(PolicyViolation::Certificate(value))
    }
}
