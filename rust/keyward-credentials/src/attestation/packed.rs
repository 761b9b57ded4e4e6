use super::{AttestationInput, VerifyStatement, check_packed_certificate};
use crate::{AttestationFormat, PolicyViolation, VerificationError, signature::verify_signature};
use keyward_encoding::{COSE_ALG_ES256, ParseError, to_pem};

/// `authData ‖ SHA256(clientDataJSON)`, the base of both packed variants.
pub fn packed_signature_base(input: &AttestationInput<'_>) -> Vec<u8> {
    let parts: [&[u8]; 2] = [&input.object.auth_data, input.client_data_hash];
    parts.concat()
}

/// `packed` attestation with an attestation certificate chain (WebAuthn §8.2).
///
/// The certificate must satisfy [`check_packed_certificate`] before its
/// signature is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackedFull;

impl VerifyStatement for PackedFull {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::Packed
    }

    fn verify(&self, input: &AttestationInput<'_>) -> Result<(), VerificationError> {
        let statement = &input.object.att_stmt;
        let signature = statement.signature()?;
        let certificate = statement.attestation_certificate()?;

        check_packed_certificate(certificate, &input.credential.aaguid)?;

        if verify_signature(signature, &packed_signature_base(input), &to_pem(certificate))? {
            Ok(())
        } else {
            Err(VerificationError::SignatureInvalid)
        }
    }
}

/// `packed` self-attestation: the credential signs its own registration.
///
/// This proves possession of the private key and nothing else. There is no
/// trust anchor, so the authenticator's provenance is unknown; a host that
/// needs provenance must not rely on credentials registered this way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackedSelf;

impl VerifyStatement for PackedSelf {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::Packed
    }

    fn verify(&self, input: &AttestationInput<'_>) -> Result<(), VerificationError> {
        let statement = &input.object.att_stmt;
        let alg = statement.alg.ok_or(ParseError::MissingField("attStmt.alg"))?;
        if alg != COSE_ALG_ES256 {
            return Err(PolicyViolation::UnsupportedAlgorithm(alg).into());
        }
        let signature = statement.signature()?;

        if verify_signature(signature, &packed_signature_base(input), &to_pem(input.public_key))? {
            Ok(())
        } else {
            Err(VerificationError::SignatureInvalid)
        }
    }
}
