//! Options handed to `navigator.credentials.create()` and
//! `navigator.credentials.get()`.

use crate::{AttestationConveyance, Challenge, Config, UserVerification};
use keyward_credentials::{AuthenticatorRecord, policy::PUBLIC_KEY_CREDENTIAL_TYPE};
use keyward_encoding::{COSE_ALG_ES256, base64url};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

/// Transports advertised for every allowed credential.
pub const ALL_TRANSPORTS: [&str; 4] = ["usb", "nfc", "ble", "internal"];

/// `PublicKeyCredentialRpEntity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingPartyEntity {
    /// Display name.
    pub name: String,
    /// Relying party identifier.
    pub id: String,
}

/// `PublicKeyCredentialUserEntity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// base64url user handle.
    pub id: String,
    /// Username.
    pub name: String,
    /// Display name.
    pub display_name: String,
}

/// `PublicKeyCredentialParameters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialParameters {
    /// Always `public-key`.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// COSE algorithm identifier.
    pub alg: i64,
}

impl CredentialParameters {
    fn public_key(alg: i64) -> Self {
        Self {
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.into(),
            alg,
        }
    }
}

/// `AuthenticatorSelectionCriteria`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    /// `discouraged`, `preferred` or `required`.
    pub resident_key: String,
    /// Legacy form of `resident_key == "required"`.
    pub require_resident_key: bool,
    /// User verification requirement.
    pub user_verification: UserVerification,
}

/// Client extension inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extensions {
    /// Ask the client to report whether the credential is discoverable.
    pub cred_props: bool,
}

/// `PublicKeyCredentialCreationOptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCreationOptions {
    /// The registration challenge.
    pub challenge: Challenge,
    /// The relying party.
    pub rp: RelyingPartyEntity,
    /// The user being registered.
    pub user: UserEntity,
    /// Acceptable credential algorithms, most preferred first.
    pub pub_key_cred_params: Vec<CredentialParameters>,
    /// Attestation conveyance.
    pub attestation: AttestationConveyance,
    /// Authenticator requirements.
    pub authenticator_selection: AuthenticatorSelection,
    /// Extension inputs.
    pub extensions: Extensions,
    /// Milliseconds the client should wait.
    pub timeout: u64,
}

/// `PublicKeyCredentialDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    /// Always `public-key`.
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Credential id.
    #[serde(with = "base64url")]
    pub id: Vec<u8>,
    /// Transports the client may try.
    pub transports: Vec<String>,
}

/// `PublicKeyCredentialRequestOptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequestOptions {
    /// The login challenge.
    pub challenge: Challenge,
    /// Credentials the user may log in with.
    pub allow_credentials: Vec<CredentialDescriptor>,
    /// User verification requirement.
    pub user_verification: UserVerification,
    /// Relying party identifier.
    pub rp_id: String,
    /// Milliseconds the client should wait.
    pub timeout: u64,
}

/// Build creation options with a fresh challenge.
///
/// `user_id` is the base64url user handle.
pub fn start_registration<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    config: &Config,
    username: &str,
    display_name: &str,
    user_id: &str,
) -> CredentialCreationOptions {
    CredentialCreationOptions {
        challenge: Challenge::generate(rng),
        rp: RelyingPartyEntity {
            name: config.rp_name.clone(),
            id: config.rp_id.clone(),
        },
        user: UserEntity {
            id: user_id.into(),
            name: username.into(),
            display_name: display_name.into(),
        },
        // Registration only stores P-256 credential keys.
        pub_key_cred_params: vec![CredentialParameters::public_key(COSE_ALG_ES256)],
        attestation: config.attestation,
        authenticator_selection: AuthenticatorSelection {
            resident_key: "preferred".into(),
            require_resident_key: false,
            user_verification: config.user_verification,
        },
        extensions: Extensions { cred_props: true },
        timeout: config.timeout_millis(),
    }
}

/// Build request options with a fresh challenge, allowing `authenticators`.
pub fn start_assertion<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    config: &Config,
    authenticators: &[AuthenticatorRecord],
) -> CredentialRequestOptions {
    let allow_credentials = authenticators
        .iter()
        .map(|authenticator| CredentialDescriptor {
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.into(),
            id: authenticator.credential_id.clone(),
            transports: ALL_TRANSPORTS.iter().map(|t| t.to_string()).collect(),
        })
        .collect();

    CredentialRequestOptions {
        challenge: Challenge::generate(rng),
        allow_credentials,
        user_verification: config.user_verification,
        rp_id: config.rp_id.clone(),
        timeout: config.timeout_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_credentials::AttestationFormat;
    use pretty_assertions::assert_eq;
    use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
    use serde_json::json;
    use testresult::TestResult;

    #[test]
    fn it_builds_creation_options_in_browser_shape() -> TestResult {
        let mut rng = ChaCha20Rng::from_seed([1; 32]);
        let options = start_registration(&mut rng, &Config::default(), "alice", "Alice", "dXNlcg");
        let json = serde_json::to_value(&options)?;

        assert_eq!(json["challenge"].as_str().map(str::len), Some(43));
        assert_eq!(json["rp"], json!({"name": "WebAuth Test", "id": "localhost"}));
        assert_eq!(
            json["user"],
            json!({"id": "dXNlcg", "name": "alice", "displayName": "Alice"})
        );
        assert_eq!(
            json["pubKeyCredParams"],
            json!([{"type": "public-key", "alg": -7}])
        );
        assert_eq!(json["attestation"], "direct");
        assert_eq!(
            json["authenticatorSelection"],
            json!({
                "residentKey": "preferred",
                "requireResidentKey": false,
                "userVerification": "preferred",
            })
        );
        assert_eq!(json["extensions"], json!({"credProps": true}));
        assert_eq!(json["timeout"], 60_000);
        Ok(())
    }

    #[test]
    fn it_allows_every_registered_credential() -> TestResult {
        let mut rng = ChaCha20Rng::from_seed([1; 32]);
        let authenticators = [
            AuthenticatorRecord {
                credential_id: vec![1, 2, 3],
                format: AttestationFormat::FidoU2f,
                public_key: vec![4; 65],
                sign_count: 0,
            },
            AuthenticatorRecord {
                credential_id: vec![5, 6],
                format: AttestationFormat::Packed,
                public_key: vec![4; 65],
                sign_count: 7,
            },
        ];
        let options = start_assertion(&mut rng, &Config::default(), &authenticators);
        let json = serde_json::to_value(&options)?;

        assert_eq!(
            json["allowCredentials"][0],
            json!({
                "type": "public-key",
                "id": "AQID",
                "transports": ["usb", "nfc", "ble", "internal"],
            })
        );
        assert_eq!(json["allowCredentials"][1]["id"], "BQY");
        assert_eq!(json["rpId"], "localhost");
        assert_eq!(json["userVerification"], "preferred");
        assert_eq!(json["timeout"], 60_000);
        Ok(())
    }

    #[test]
    fn it_issues_a_new_challenge_each_time() {
        let mut rng = ChaCha20Rng::from_seed([1; 32]);
        let config = Config::default();
        let first = start_assertion(&mut rng, &config, &[]);
        let second = start_assertion(&mut rng, &config, &[]);
        assert_ne!(first.challenge, second.challenge);
    }
}
