use crate::{ErrorKind, VerificationError};
use keyward_encoding::{ParseError, base64url, to_pem};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The attestation statement formats this crate verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttestationFormat {
    /// `fido-u2f`.
    #[serde(rename = "fido-u2f")]
    FidoU2f,
    /// `packed`, with or without a certificate chain.
    #[serde(rename = "packed")]
    Packed,
    /// `none`.
    #[serde(rename = "none")]
    None,
}

impl AttestationFormat {
    /// The `fmt` identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            AttestationFormat::FidoU2f => "fido-u2f",
            AttestationFormat::Packed => "packed",
            AttestationFormat::None => "none",
        }
    }
}

impl fmt::Display for AttestationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttestationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fido-u2f" => Ok(AttestationFormat::FidoU2f),
            "packed" => Ok(AttestationFormat::Packed),
            "none" => Ok(AttestationFormat::None),
            other => Err(format!("unknown attestation format {other:?}")),
        }
    }
}

/// A registered authenticator, as the host persists it.
///
/// Produced by a successful attestation. Afterwards only `sign_count` ever
/// changes, and only upwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorRecord {
    /// Opaque credential identifier.
    #[serde(rename = "credID", with = "base64url")]
    pub credential_id: Vec<u8>,
    /// Attestation format the credential was registered with.
    #[serde(rename = "fmt")]
    pub format: AttestationFormat,
    /// Raw uncompressed P-256 point (65 bytes).
    #[serde(rename = "publicKey", with = "base64url")]
    pub public_key: Vec<u8>,
    /// Last accepted signature counter.
    #[serde(rename = "counter")]
    pub sign_count: u32,
}

impl AuthenticatorRecord {
    /// The credential id in base64url, as it appears in JSON.
    pub fn credential_id_base64url(&self) -> String {
        base64url::encode(&self.credential_id)
    }

    /// The stored public key framed as a PEM `PUBLIC KEY`.
    pub fn public_key_pem(&self) -> String {
        to_pem(&self.public_key)
    }

    /// Decode a record from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] for malformed JSON or missing fields.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ParseError> {
        serde_json::from_slice(bytes).map_err(|e| ParseError::Json(e.to_string()))
    }
}

/// The flat `{verified, authenticatorInfo, failureReason}` view of a
/// verification, for hosts that report results as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    /// Whether every check passed.
    pub verified: bool,
    /// The new or updated record on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_info: Option<AuthenticatorRecord>,
    /// Error category on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<ErrorKind>,
    /// Human-readable failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerificationReport {
    /// A successful verification.
    pub fn verified(record: AuthenticatorRecord) -> Self {
        Self {
            verified: true,
            authenticator_info: Some(record),
            failure_reason: None,
            message: None,
        }
    }

    /// A failed verification.
    pub fn failed(error: &VerificationError) -> Self {
        Self {
            verified: false,
            authenticator_info: None,
            failure_reason: Some(error.kind()),
            message: Some(error.to_string()),
        }
    }
}

impl From<Result<AuthenticatorRecord, VerificationError>> for VerificationReport {
    fn from(result: Result<AuthenticatorRecord, VerificationError>) -> Self {
        match result {
            Ok(record) => Self::verified(record),
            Err(error) => Self::failed(&error),
        }
    }
}
