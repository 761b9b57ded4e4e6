//! Authenticator data (WebAuthn §6.1).
//!
//! ```text
//!  0      32     33        37        53          55              55+L
//!  ├──────┼──────┼─────────┼─────────┼───────────┼───────────────┼──────────────┐
//!  │rpIdHash│flags│signCount│ aaguid  │ credIdLen │ credentialId  │ COSE key ... │
//!  └──────┴──────┴─────────┴─────────┴───────────┴───────────────┴──────────────┘
//!   ◄──────── assertion ──────►◄──────── attested credential data ────────────►
//! ```
//!
//! Assertions carry only the first three fields. Registrations additionally
//! carry the attested credential data.

use crate::{CoseKey, ParseError, reader::ByteReader};

/// Minimum length of any authenticator data buffer.
pub const AUTHENTICATOR_DATA_MIN_LEN: usize = 37;

/// The authenticator flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthenticatorFlags(pub u8);

impl AuthenticatorFlags {
    /// User present (UP).
    pub const USER_PRESENT: u8 = 0x01;
    /// User verified (UV).
    pub const USER_VERIFIED: u8 = 0x04;
    /// Attested credential data included (AT).
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    /// Extension data included (ED).
    pub const EXTENSION_DATA: u8 = 0x80;

    /// The raw byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether the user-present bit is set.
    pub const fn user_present(self) -> bool {
        self.0 & Self::USER_PRESENT != 0
    }

    /// Whether the user-verified bit is set.
    pub const fn user_verified(self) -> bool {
        self.0 & Self::USER_VERIFIED != 0
    }

    /// Whether attested credential data follows the counter.
    pub const fn attested_credential_data(self) -> bool {
        self.0 & Self::ATTESTED_CREDENTIAL_DATA != 0
    }

    /// Whether extension data follows the credential data.
    pub const fn extension_data(self) -> bool {
        self.0 & Self::EXTENSION_DATA != 0
    }
}

/// Credential data present in registration authenticator data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    /// Authenticator model identifier.
    pub aaguid: [u8; 16],
    /// Opaque credential identifier chosen by the authenticator.
    pub credential_id: Vec<u8>,
    /// The CBOR-encoded COSE_Key, exactly as it appeared on the wire.
    pub credential_public_key: Vec<u8>,
    /// The decoded COSE_Key.
    pub cose_key: CoseKey,
}

/// A parsed view over an authenticator data buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    /// SHA-256 of the relying party identifier.
    pub rp_id_hash: [u8; 32],
    /// Flags byte.
    pub flags: AuthenticatorFlags,
    /// Signature counter.
    pub sign_count: u32,
    /// Present only for registration responses.
    pub attested_credential: Option<AttestedCredentialData>,
    /// Raw CBOR extension outputs, when the ED flag is set.
    pub extensions: Option<Vec<u8>>,
}

impl AuthenticatorData {
    /// Parse the get-assertion layout: rpIdHash, flags and counter.
    ///
    /// Bytes beyond the first 37 (extension outputs) are kept verbatim in
    /// [`AuthenticatorData::extensions`] and otherwise ignored.
    pub fn parse_assertion(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = ByteReader::new(bytes);
        let (rp_id_hash, flags, sign_count) = read_header(&mut reader)?;
        let rest = reader.rest();
        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential: None,
            extensions: (!rest.is_empty()).then(|| rest.to_vec()),
        })
    }

    /// Parse the make-credential layout, which must include attested
    /// credential data.
    pub fn parse_registration(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = ByteReader::new(bytes);
        let (rp_id_hash, flags, sign_count) = read_header(&mut reader)?;

        let aaguid = reader.take_array::<16>("aaguid")?;
        let credential_id_len = reader.u16_be("credential id length")?;
        let credential_id = reader.take(usize::from(credential_id_len), "credential id")?;

        let key_bytes = reader.rest();
        if key_bytes.is_empty() {
            return Err(ParseError::MissingField("credential public key"));
        }
        let (cose_key, used) = CoseKey::decode_prefix(key_bytes)?;
        let trailing = &key_bytes[used..];

        let extensions = if trailing.is_empty() {
            None
        } else if flags.extension_data() {
            Some(trailing.to_vec())
        } else {
            return Err(ParseError::TrailingBytes(
                trailing.len(),
                "credential public key",
            ));
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential: Some(AttestedCredentialData {
                aaguid,
                credential_id: credential_id.to_vec(),
                credential_public_key: key_bytes[..used].to_vec(),
                cose_key,
            }),
            extensions,
        })
    }

    /// The 4-byte big-endian encoding of the counter, as signed.
    pub fn sign_count_bytes(&self) -> [u8; 4] {
        self.sign_count.to_be_bytes()
    }

    /// Serialize back into the wire layout.
    ///
    /// # Errors
    ///
    /// Fails when the credential id does not fit its 16 bit length prefix.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ParseError> {
        let mut out = Vec::with_capacity(AUTHENTICATOR_DATA_MIN_LEN);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(self.flags.bits());
        out.extend_from_slice(&self.sign_count_bytes());
        if let Some(credential) = &self.attested_credential {
            let id_len = u16::try_from(credential.credential_id.len()).map_err(|_| {
                ParseError::TooLong {
                    field: "credentialId",
                    max: usize::from(u16::MAX),
                    actual: credential.credential_id.len(),
                }
            })?;
            out.extend_from_slice(&credential.aaguid);
            out.extend_from_slice(&id_len.to_be_bytes());
            out.extend_from_slice(&credential.credential_id);
            out.extend_from_slice(&credential.credential_public_key);
        }
        if let Some(extensions) = &self.extensions {
            out.extend_from_slice(extensions);
        }
        Ok(out)
    }
}

fn read_header(
    reader: &mut ByteReader<'_>,
) -> Result<([u8; 32], AuthenticatorFlags, u32), ParseError> {
    let rp_id_hash = reader.take_array::<32>("rpIdHash")?;
    let flags = AuthenticatorFlags(reader.u8("flags")?);
    let sign_count = reader.u32_be("signCount")?;
    Ok((rp_id_hash, flags, sign_count))
}
