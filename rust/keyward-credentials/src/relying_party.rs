use crate::{
    AssertionOutcome, AssertionResponse, AttestationOptions, AuthenticatorRecord, CeremonyType,
    ClientData, ClientDataPolicy, VerificationError, assertion, policy::check_credential_type,
    verify_attestation,
};
use keyward_encoding::base64url;
use serde::{Deserialize, Serialize};

/// `AuthenticatorAttestationResponse` as posted by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationResponse {
    /// Raw `clientDataJSON`.
    #[serde(rename = "clientDataJSON", with = "base64url")]
    pub client_data_json: Vec<u8>,
    /// CBOR attestation object.
    #[serde(rename = "attestationObject", with = "base64url")]
    pub attestation_object: Vec<u8>,
}

/// The `PublicKeyCredential` returned by `navigator.credentials.create()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCredential {
    /// base64url credential id.
    pub id: String,
    /// Credential id.
    #[serde(with = "base64url")]
    pub raw_id: Vec<u8>,
    /// Always `public-key` for a credential we accept.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// The attestation.
    pub response: AttestationResponse,
}

/// The `PublicKeyCredential` returned by `navigator.credentials.get()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionCredential {
    /// base64url credential id.
    pub id: String,
    /// Credential id.
    #[serde(with = "base64url")]
    pub raw_id: Vec<u8>,
    /// Always `public-key` for a credential we accept.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// The assertion.
    pub response: AssertionResponse,
}

/// A relying party's view of WebAuthn responses.
///
/// Combines the client data policy with the attestation and assertion
/// verifiers so that every policy check runs before any signature check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    /// Relying party identifier, usually the effective domain.
    pub rp_id: String,
    /// Expected `clientData.origin`.
    pub origin: String,
    /// Register credentials with `none` attestation.
    pub accept_none_attestation: bool,
}

impl RelyingParty {
    /// A relying party that rejects `none` attestation.
    pub fn new(rp_id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            rp_id: rp_id.into(),
            origin: origin.into(),
            accept_none_attestation: false,
        }
    }

    /// Set whether `none` attestation is accepted.
    pub fn with_none_attestation(mut self, accept: bool) -> Self {
        self.accept_none_attestation = accept;
        self
    }

    fn policy<'a>(&'a self, ceremony: CeremonyType, challenge: &'a str) -> ClientDataPolicy<'a> {
        ClientDataPolicy {
            ceremony,
            challenge,
            origin: &self.origin,
        }
    }

    /// Verify a registration against the challenge issued for it.
    ///
    /// # Errors
    ///
    /// Fails on a credential type other than `public-key`, on client data that
    /// does not parse or does not match the ceremony, challenge and origin, and
    /// for every reason [`verify_attestation`] fails.
    pub fn verify_attestation(
        &self,
        credential: &RegistrationCredential,
        challenge: &str,
    ) -> Result<AuthenticatorRecord, VerificationError> {
        check_credential_type(&credential.credential_type)?;
        let client_data_json = &credential.response.client_data_json;
        let client_data = ClientData::from_json(client_data_json)?;
        self.policy(CeremonyType::Create, challenge)
            .check(&client_data)?;

        let options = AttestationOptions {
            accept_none_attestation: self.accept_none_attestation,
            rp_id: Some(self.rp_id.clone()),
        };
        verify_attestation(
            &credential.response.attestation_object,
            client_data_json,
            &options,
        )
    }

    /// Verify a login against the challenge issued for it and the record the
    /// host found for `credential.raw_id`.
    ///
    /// # Errors
    ///
    /// Fails on a credential type other than `public-key`, on client data that
    /// does not parse or does not match the ceremony, challenge and origin, and
    /// for every reason [`assertion::verify_assertion`] fails.
    pub fn verify_assertion(
        &self,
        credential: &AssertionCredential,
        stored: Option<&AuthenticatorRecord>,
        challenge: &str,
    ) -> Result<AssertionOutcome, VerificationError> {
        check_credential_type(&credential.credential_type)?;
        let client_data = ClientData::from_json(&credential.response.client_data_json)?;
        self.policy(CeremonyType::Get, challenge)
            .check(&client_data)?;

        assertion::verify(
            Some(&self.rp_id),
            &credential.raw_id,
            &credential.response,
            stored,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ErrorKind, PolicyViolation,
        helpers::{SoftAuthenticator, client_data_json},
    };
    use testresult::TestResult;

    const RP_ID: &str = "localhost";
    const ORIGIN: &str = "http://localhost:8080";
    const CHALLENGE: &str = "Xn6EnBdGA3eIqiBJKKxmQ2VS6yq3tyDmHyrmFwbe8bU";

    #[test]
    fn it_registers_with_self_attestation() -> TestResult {
        let rp = RelyingParty::new(RP_ID, ORIGIN);
        let authenticator = SoftAuthenticator::new(RP_ID, [9; 32]);
        let client_data = client_data_json(CeremonyType::Create, CHALLENGE, ORIGIN);
        let object = authenticator.attest_self(&client_data)?;
        let credential = authenticator.registration_credential(client_data, object);

        let record = rp.verify_attestation(&credential, CHALLENGE)?;

        assert_eq!(record.credential_id, authenticator.credential_id());
        assert_eq!(record.format, crate::AttestationFormat::Packed);
        Ok(())
    }

    #[test]
    fn it_rejects_non_public_key_credentials() -> TestResult {
        let rp = RelyingParty::new(RP_ID, ORIGIN);
        let authenticator = SoftAuthenticator::new(RP_ID, [9; 32]);
        let client_data = client_data_json(CeremonyType::Create, CHALLENGE, ORIGIN);
        let object = authenticator.attest_self(&client_data)?;
        let mut credential = authenticator.registration_credential(client_data, object);
        credential.credential_type = "password".into();

        assert_eq!(
            rp.verify_attestation(&credential, CHALLENGE),
            Err(VerificationError::from(
                PolicyViolation::UnsupportedCredentialType("password".into())
            ))
        );
        Ok(())
    }

    #[test]
    fn it_rejects_a_login_response_posted_as_a_registration() -> TestResult {
        let rp = RelyingParty::new(RP_ID, ORIGIN);
        let authenticator = SoftAuthenticator::new(RP_ID, [9; 32]);
        let client_data = client_data_json(CeremonyType::Get, CHALLENGE, ORIGIN);
        let object = authenticator.attest_self(&client_data)?;
        let credential = authenticator.registration_credential(client_data, object);

        let error = rp
            .verify_attestation(&credential, CHALLENGE)
            .err()
            .ok_or("expected a policy error")?;
        assert_eq!(error.kind(), ErrorKind::Policy);
        Ok(())
    }

    #[test]
    fn it_rejects_authenticators_scoped_to_another_rp() -> TestResult {
        let rp = RelyingParty::new(RP_ID, ORIGIN);
        let authenticator = SoftAuthenticator::new("example.com", [9; 32]);
        let stored = AuthenticatorRecord {
            credential_id: authenticator.credential_id().to_vec(),
            format: crate::AttestationFormat::Packed,
            public_key: authenticator.public_key().to_vec(),
            sign_count: 0,
        };
        let client_data = client_data_json(CeremonyType::Get, CHALLENGE, ORIGIN);
        let credential = authenticator.assertion_credential(&client_data, 1);

        assert_eq!(
            rp.verify_assertion(&credential, Some(&stored), CHALLENGE),
            Err(VerificationError::from(PolicyViolation::RpIdHashMismatch))
        );
        Ok(())
    }

    #[test]
    fn it_deserializes_browser_json() -> TestResult {
        let json = serde_json::json!({
            "id": "AQID",
            "rawId": "AQID",
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30",
                "attestationObject": "oA",
            },
        });
        let credential: RegistrationCredential = serde_json::from_value(json)?;

        assert_eq!(credential.raw_id, vec![1, 2, 3]);
        assert_eq!(credential.response.client_data_json, b"{}".to_vec());
        assert_eq!(credential.response.attestation_object, vec![0xa0]);
        Ok(())
    }
}
