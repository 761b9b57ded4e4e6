use super::{AttestationInput, VerifyStatement};
use crate::{AttestationFormat, PolicyViolation, VerificationError};

/// `none` attestation: no statement, no signature.
///
/// Whether such a credential may be registered is a relying-party decision,
/// carried in `accept`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoneAttestation {
    /// Register credentials that carry no attestation.
    pub accept: bool,
}

impl VerifyStatement for NoneAttestation {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::None
    }

    fn verify(&self, _input: &AttestationInput<'_>) -> Result<(), VerificationError> {
        if self.accept {
            Ok(())
        } else {
            Err(PolicyViolation::NoneAttestationRejected.into())
        }
    }
}
