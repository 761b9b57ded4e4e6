//! Login: assertion signature and counter verification.

use crate::{
    AuthenticatorRecord, VerificationError, client_data_hash,
    policy::{check_rp_id_hash, check_user_present},
    signature::verify_signature,
};
use keyward_encoding::{AuthenticatorData, base64url};
use serde::{Deserialize, Serialize};

/// The `AuthenticatorAssertionResponse` members that are verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    /// Raw authenticator data.
    #[serde(with = "base64url")]
    pub authenticator_data: Vec<u8>,
    /// Raw `clientDataJSON`.
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,
    /// DER ECDSA signature.
    #[serde(with = "base64url")]
    pub signature: Vec<u8>,
    /// User handle returned by discoverable credentials.
    #[serde(
        default,
        with = "base64url::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_handle: Option<Vec<u8>>,
}

/// A verified assertion.
///
/// The host must store `new_sign_count` only if the record still holds
/// `previous_sign_count`, as one atomic compare-and-swap. Otherwise two
/// assertions racing over the same counter could both be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionOutcome {
    /// The credential that signed.
    pub credential_id: Vec<u8>,
    /// Counter of the record the assertion was checked against.
    pub previous_sign_count: u32,
    /// Counter carried by the assertion.
    pub new_sign_count: u32,
    /// Whether the authenticator verified the user.
    pub user_verified: bool,
}

impl AssertionOutcome {
    /// `stored` with its counter advanced.
    pub fn updated(&self, stored: &AuthenticatorRecord) -> AuthenticatorRecord {
        AuthenticatorRecord {
            sign_count: self.new_sign_count,
            ..stored.clone()
        }
    }
}

/// `rpIdHash ‖ flags ‖ signCount ‖ SHA256(clientDataJSON)`.
pub fn assertion_signature_base(auth_data: &AuthenticatorData, client_data_json: &[u8]) -> Vec<u8> {
    let mut base = Vec::with_capacity(32 + 1 + 4 + 32);
    base.extend_from_slice(&auth_data.rp_id_hash);
    base.push(auth_data.flags.bits());
    base.extend_from_slice(&auth_data.sign_count_bytes());
    base.extend_from_slice(&client_data_hash(client_data_json));
    base
}

/// Verify an assertion made with `credential_id` against the stored record.
///
/// `stored` is the host's lookup result; `None` means the credential is
/// unknown. The record is never modified here.
///
/// # Errors
///
/// [`VerificationError::NotFound`] when `stored` is `None`, a policy error
/// when the user was not present, [`VerificationError::SignatureInvalid`]
/// when the signature does not verify and [`VerificationError::Replay`] when
/// the counter did not advance.
pub fn verify_assertion(
    credential_id: &[u8],
    response: &AssertionResponse,
    stored: Option<&AuthenticatorRecord>,
) -> Result<AssertionOutcome, VerificationError> {
    verify(None, credential_id, response, stored)
}

pub(crate) fn verify(
    rp_id: Option<&str>,
    credential_id: &[u8],
    response: &AssertionResponse,
    stored: Option<&AuthenticatorRecord>,
) -> Result<AssertionOutcome, VerificationError> {
    let stored = stored
        .filter(|record| record.credential_id == credential_id)
        .ok_or_else(|| VerificationError::NotFound {
            credential_id: base64url::encode(credential_id),
        })?;

    let auth_data = AuthenticatorData::parse_assertion(&response.authenticator_data)?;
    if let Some(rp_id) = rp_id {
        check_rp_id_hash(&auth_data.rp_id_hash, rp_id)?;
    }
    check_user_present(auth_data.flags)?;

    let base = assertion_signature_base(&auth_data, &response.client_data_json);
    if !verify_signature(&response.signature, &base, &stored.public_key_pem())? {
        return Err(VerificationError::SignatureInvalid);
    }

    if auth_data.sign_count <= stored.sign_count {
        return Err(VerificationError::Replay {
            stored: stored.sign_count,
            received: auth_data.sign_count,
        });
    }

    Ok(AssertionOutcome {
        credential_id: stored.credential_id.clone(),
        previous_sign_count: stored.sign_count,
        new_sign_count: auth_data.sign_count,
        user_verified: auth_data.flags.user_verified(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, PolicyViolation, helpers::SoftAuthenticator};
    use keyward_encoding::ParseError;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    const CLIENT_DATA: &[u8] =
        br#"{"type":"webauthn.get","challenge":"abc","origin":"http://localhost:8080"}"#;

    fn record(authenticator: &SoftAuthenticator, sign_count: u32) -> AuthenticatorRecord {
        AuthenticatorRecord {
            credential_id: authenticator.credential_id().to_vec(),
            format: crate::AttestationFormat::FidoU2f,
            public_key: authenticator.public_key().to_vec(),
            sign_count,
        }
    }

    #[test]
    fn it_accepts_a_strictly_increasing_counter() -> TestResult {
        let authenticator = SoftAuthenticator::new("localhost", [3; 32]);
        let stored = record(&authenticator, 5);
        let response = authenticator.assert(CLIENT_DATA, 6);

        let outcome = verify_assertion(authenticator.credential_id(), &response, Some(&stored))?;

        assert_eq!(outcome.previous_sign_count, 5);
        assert_eq!(outcome.new_sign_count, 6);
        assert_eq!(outcome.updated(&stored).sign_count, 6);
        assert_eq!(stored.sign_count, 5);
        Ok(())
    }

    #[test]
    fn it_rejects_replayed_counters_even_with_a_valid_signature() {
        let authenticator = SoftAuthenticator::new("localhost", [3; 32]);
        let stored = record(&authenticator, 5);

        for received in [5, 4] {
            let response = authenticator.assert(CLIENT_DATA, received);
            assert_eq!(
                verify_assertion(authenticator.credential_id(), &response, Some(&stored)),
                Err(VerificationError::Replay {
                    stored: 5,
                    received,
                })
            );
        }
    }

    #[test]
    fn it_reports_unknown_credentials() {
        let authenticator = SoftAuthenticator::new("localhost", [3; 32]);
        let other = SoftAuthenticator::new("localhost", [4; 32]);
        let response = authenticator.assert(CLIENT_DATA, 1);

        for stored in [None, Some(record(&other, 0))] {
            let result = verify_assertion(authenticator.credential_id(), &response, stored.as_ref());
            assert_eq!(result.map_err(|e| e.kind()), Err(ErrorKind::NotFound));
        }
    }

    #[test]
    fn it_rejects_signatures_from_another_key() {
        let authenticator = SoftAuthenticator::new("localhost", [3; 32]);
        let impostor = SoftAuthenticator::new("localhost", [4; 32])
            .with_credential_id(authenticator.credential_id().to_vec());
        let stored = record(&authenticator, 0);
        let response = impostor.assert(CLIENT_DATA, 1);

        assert_eq!(
            verify_assertion(authenticator.credential_id(), &response, Some(&stored)),
            Err(VerificationError::SignatureInvalid)
        );
    }

    #[test]
    fn it_binds_the_signature_to_the_client_data() {
        let authenticator = SoftAuthenticator::new("localhost", [3; 32]);
        let stored = record(&authenticator, 0);
        let mut response = authenticator.assert(CLIENT_DATA, 1);
        response.client_data_json =
            br#"{"type":"webauthn.get","challenge":"abd","origin":"http://localhost:8080"}"#
                .to_vec();

        assert_eq!(
            verify_assertion(authenticator.credential_id(), &response, Some(&stored)),
            Err(VerificationError::SignatureInvalid)
        );
    }

    #[test]
    fn it_requires_user_presence() {
        let authenticator = SoftAuthenticator::new("localhost", [3; 32]).without_user_presence();
        let stored = record(&authenticator, 0);
        let response = authenticator.assert(CLIENT_DATA, 1);

        assert_eq!(
            verify_assertion(authenticator.credential_id(), &response, Some(&stored)),
            Err(VerificationError::from(PolicyViolation::UserNotPresent))
        );
    }

    #[test]
    fn it_rejects_truncated_authenticator_data() {
        let authenticator = SoftAuthenticator::new("localhost", [3; 32]);
        let stored = record(&authenticator, 0);
        let mut response = authenticator.assert(CLIENT_DATA, 1);
        response.authenticator_data.truncate(36);

        assert!(matches!(
            verify_assertion(authenticator.credential_id(), &response, Some(&stored)),
            Err(VerificationError::Parse(ParseError::Truncated { .. }))
        ));
    }

    #[test]
    fn it_checks_the_rp_id_when_given() {
        let authenticator = SoftAuthenticator::new("localhost", [3; 32]);
        let stored = record(&authenticator, 0);
        let response = authenticator.assert(CLIENT_DATA, 1);

        assert_eq!(
            verify(
                Some("example.com"),
                authenticator.credential_id(),
                &response,
                Some(&stored)
            ),
            Err(VerificationError::from(PolicyViolation::RpIdHashMismatch))
        );
    }
}
