//! Registration: attestation statement verification.
//!
//! [`verify_attestation`] decodes the attestation object, checks what can be
//! checked without cryptography, then hands the statement to the handler for
//! its `fmt`. Each handler owns its signature base and its policy, so the
//! formats stay independent of one another:
//!
//! | `fmt`      | handler             | verifying key                       |
//! |------------|---------------------|-------------------------------------|
//! | `fido-u2f` | [`FidoU2f`]         | `x5c[0]`                            |
//! | `packed`   | [`PackedFull`]      | `x5c[0]`, plus certificate policy   |
//! | `packed`   | [`PackedSelf`]      | the credential key itself           |
//! | `none`     | [`NoneAttestation`] | none; accepted only when configured |

mod certificate;
mod country;
mod fido_u2f;
mod none;
mod packed;

pub use certificate::*;
pub use fido_u2f::*;
pub use none::*;
pub use packed::*;

use crate::{
    AttestationFormat, AuthenticatorRecord, PolicyViolation, VerificationError,
    client_data_hash,
    policy::{check_rp_id_hash, check_user_present},
};
use keyward_encoding::{
    AttestationObject, AttestedCredentialData, AuthenticatorData, COSE_ALG_ES256, COSE_CRV_P256,
    COSE_KTY_EC2, CoseKey, ParseError, RAW_POINT_LEN,
};

/// Relying-party settings that affect attestation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestationOptions {
    /// Accept `none` attestation, i.e. register credentials whose provenance
    /// cannot be established.
    pub accept_none_attestation: bool,
    /// When set, `rpIdHash` must equal `SHA256(rp_id)`.
    pub rp_id: Option<String>,
}

/// Everything a format handler needs, decoded once by the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct AttestationInput<'a> {
    /// The decoded attestation object.
    pub object: &'a AttestationObject,
    /// `object.auth_data`, parsed.
    pub auth_data: &'a AuthenticatorData,
    /// The attested credential carried by `auth_data`.
    pub credential: &'a AttestedCredentialData,
    /// The credential public key as a raw uncompressed point.
    pub public_key: &'a [u8; RAW_POINT_LEN],
    /// `SHA256(clientDataJSON)`.
    pub client_data_hash: &'a [u8; 32],
}

/// One attestation statement format.
pub trait VerifyStatement {
    /// The format recorded for credentials this handler accepts.
    fn format(&self) -> AttestationFormat;

    /// Verify the statement. Policy checks come before any signature check.
    fn verify(&self, input: &AttestationInput<'_>) -> Result<(), VerificationError>;
}

/// The closed set of supported statement formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHandler {
    /// `fido-u2f`.
    FidoU2f(FidoU2f),
    /// `packed` with an attestation certificate.
    PackedFull(PackedFull),
    /// `packed` without an attestation certificate.
    PackedSelf(PackedSelf),
    /// `none`.
    None(NoneAttestation),
}

impl FormatHandler {
    /// Pick the handler for an attestation object's `fmt`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::UnsupportedFormat`] for any other `fmt`.
    pub fn select(
        object: &AttestationObject,
        options: &AttestationOptions,
    ) -> Result<Self, PolicyViolation> {
        match object.fmt.as_str() {
            "fido-u2f" => Ok(FormatHandler::FidoU2f(FidoU2f)),
            "packed" if object.att_stmt.x5c.is_some() => Ok(FormatHandler::PackedFull(PackedFull)),
            "packed" => Ok(FormatHandler::PackedSelf(PackedSelf)),
            "none" => Ok(FormatHandler::None(NoneAttestation {
                accept: options.accept_none_attestation,
            })),
            other => Err(PolicyViolation::UnsupportedFormat(other.to_string())),
        }
    }

    fn handler(&self) -> &dyn VerifyStatement {
        match self {
            FormatHandler::FidoU2f(handler) => handler,
            FormatHandler::PackedFull(handler) => handler,
            FormatHandler::PackedSelf(handler) => handler,
            FormatHandler::None(handler) => handler,
        }
    }
}

impl VerifyStatement for FormatHandler {
    fn format(&self) -> AttestationFormat {
        self.handler().format()
    }

    fn verify(&self, input: &AttestationInput<'_>) -> Result<(), VerificationError> {
        self.handler().verify(input)
    }
}

/// Verify a registration response and produce the record to persist.
///
/// `client_data_json` must already have passed the client data policy; this
/// function only uses its hash.
///
/// # Errors
///
/// A parse error for malformed CBOR, authenticator data or COSE keys, a
/// policy error for an unsupported format or key, a failed presence or
/// rpIdHash check or a refused certificate, and
/// [`VerificationError::SignatureInvalid`] when the statement signature does
/// not verify.
pub fn verify_attestation(
    attestation_object: &[u8],
    client_data_json: &[u8],
    options: &AttestationOptions,
) -> Result<AuthenticatorRecord, VerificationError> {
    let object = AttestationObject::from_cbor(attestation_object)?;
    let handler = FormatHandler::select(&object, options)?;

    let auth_data = AuthenticatorData::parse_registration(&object.auth_data)?;
    let credential = auth_data
        .attested_credential
        .as_ref()
        .ok_or(ParseError::MissingField("attested credential data"))?;

    if let Some(rp_id) = &options.rp_id {
        check_rp_id_hash(&auth_data.rp_id_hash, rp_id)?;
    }
    check_user_present(auth_data.flags)?;
    check_key_algorithm(&credential.cose_key)?;
    let public_key = credential.cose_key.to_raw_point()?;

    let client_data_hash = client_data_hash(client_data_json);
    handler.verify(&AttestationInput {
        object: &object,
        auth_data: &auth_data,
        credential,
        public_key: &public_key,
        client_data_hash: &client_data_hash,
    })?;

    Ok(AuthenticatorRecord {
        credential_id: credential.credential_id.clone(),
        format: handler.format(),
        public_key: public_key.to_vec(),
        sign_count: auth_data.sign_count,
    })
}

/// Credential keys are ES256 on P-256; labels that are present must agree.
fn check_key_algorithm(key: &CoseKey) -> Result<(), PolicyViolation> {
    if let Some(alg) = key.alg.filter(|alg| *alg != COSE_ALG_ES256) {
        return Err(PolicyViolation::UnsupportedAlgorithm(alg));
    }
    if let Some(kty) = key.kty.filter(|kty| *kty != COSE_KTY_EC2) {
        return Err(PolicyViolation::UnsupportedKeyType(kty));
    }
    match key.crv {
        Some(crv) if crv != COSE_CRV_P256 => Err(PolicyViolation::UnsupportedCurve(crv)),
        _ => Ok(()),
    }
}
