//! The `clientDataJSON` collected by the browser.

use keyward_encoding::ParseError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The ceremony a client data blob was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CeremonyType {
    /// Registration, `navigator.credentials.create()`.
    Create,
    /// Authentication, `navigator.credentials.get()`.
    Get,
}

impl CeremonyType {
    /// The `clientData.type` string for this ceremony.
    pub const fn as_str(self) -> &'static str {
        match self {
            CeremonyType::Create => "webauthn.create",
            CeremonyType::Get => "webauthn.get",
        }
    }
}

impl std::fmt::Display for CeremonyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded `clientDataJSON`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientData {
    /// `webauthn.create` or `webauthn.get`.
    #[serde(rename = "type")]
    pub ceremony: String,
    /// base64url challenge, exactly as the client echoed it.
    pub challenge: String,
    /// Origin of the calling page.
    pub origin: String,
    /// Set when the request came from a cross-origin iframe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<bool>,
}

impl ClientData {
    /// Decode the raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] for malformed JSON or missing members.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ParseError> {
        serde_json::from_slice(bytes).map_err(|e| ParseError::Json(e.to_string()))
    }

    /// Encode to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, ParseError> {
        serde_json::to_vec(self).map_err(|e| ParseError::Json(e.to_string()))
    }
}

/// `SHA256(clientDataJSON)`, the form in which client data enters every
/// signature base.
pub fn client_data_hash(client_data_json: &[u8]) -> [u8; 32] {
    Sha256::digest(client_data_json).into()
}
