//! Unpadded base64url, the encoding WebAuthn uses for binary JSON members.
//!
//! The module doubles as a serde adapter:
//!
//! ```
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct Credential {
//!     #[serde(with = "keyward_encoding::base64url")]
//!     id: Vec<u8>,
//! }
//! ```

use crate::ParseError;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Deserializer, Serializer};

/// Encode without padding.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode, tolerating trailing `=` padding some clients add.
pub fn decode(text: &str) -> Result<Vec<u8>, ParseError> {
    Ok(URL_SAFE_NO_PAD.decode(text.trim_end_matches('='))?)
}

/// Serialize bytes as a base64url string.
pub fn serialize<S>(bytes: impl AsRef<[u8]>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&encode(bytes))
}

/// Deserialize bytes from a base64url string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    decode(&text).map_err(serde::de::Error::custom)
}

/// Serde adapter for `Option<Vec<u8>>` members.
pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an optional byte string.
    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&super::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional byte string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|text| super::decode(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
