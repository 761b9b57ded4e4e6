use super::{AttestationInput, VerifyStatement};
use crate::{AttestationFormat, VerificationError, signature::verify_signature};
use keyward_encoding::to_pem;

/// `fido-u2f` attestation (WebAuthn §8.6).
///
/// The signature covers
/// `0x00 ‖ rpIdHash ‖ SHA256(clientDataJSON) ‖ credentialId ‖ publicKey`
/// and is made by the key in the single attestation certificate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FidoU2f;

impl FidoU2f {
    /// The bytes the attestation certificate signs.
    pub fn signature_base(input: &AttestationInput<'_>) -> Vec<u8> {
        let parts: [&[u8]; 5] = [
            &[0x00],
            &input.auth_data.rp_id_hash,
            input.client_data_hash,
            &input.credential.credential_id,
            input.public_key,
        ];
        parts.concat()
    }
}

impl VerifyStatement for FidoU2f {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::FidoU2f
    }

    fn verify(&self, input: &AttestationInput<'_>) -> Result<(), VerificationError> {
        let statement = &input.object.att_stmt;
        let signature = statement.signature()?;
        let certificate = to_pem(statement.attestation_certificate()?);

        if verify_signature(signature, &Self::signature_base(input), &certificate)? {
            Ok(())
        } else {
            Err(VerificationError::SignatureInvalid)
        }
    }
}
