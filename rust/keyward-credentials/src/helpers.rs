//! A software authenticator for tests.
//!
//! [`SoftAuthenticator`] produces the same bytes a hardware authenticator
//! would: authenticator data, COSE keys, CBOR attestation objects and DER
//! signatures. Attestation certificates are minted with `rcgen`.

use crate::{
    AssertionCredential, AssertionResponse, AttestationResponse, CeremonyType, ClientData,
    RegistrationCredential, client_data_hash, policy::PUBLIC_KEY_CREDENTIAL_TYPE,
};
use keyward_encoding::{
    AttestationObject, AttestationStatement, AttestedCredentialData, AuthenticatorData,
    AuthenticatorFlags, COSE_ALG_ES256, CoseKey, RAW_POINT_LEN, base64url,
};
use p256::ecdsa::{DerSignature, SigningKey, signature::Signer as _};
use rand_chacha::{ChaCha20Rng, rand_core::SeedableRng};
use rcgen::{CertificateParams, CustomExtension, DnType, IsCa, KeyPair};
use sha2::{Digest, Sha256};

/// AAGUID reported by [`SoftAuthenticator`] unless overridden.
pub const SOFT_AUTHENTICATOR_AAGUID: [u8; 16] = *b"keyward-software";

/// Build `clientDataJSON` bytes for a ceremony.
pub fn client_data_json(ceremony: CeremonyType, challenge: &str, origin: &str) -> Vec<u8> {
    let client_data = ClientData {
        ceremony: ceremony.as_str().to_string(),
        challenge: challenge.to_string(),
        origin: origin.to_string(),
        cross_origin: Some(false),
    };
    // Plain strings always serialize.
    serde_json::to_vec(&client_data).unwrap_or_default()
}

/// An attestation certificate and the key that signs with it.
#[derive(Debug, Clone)]
pub struct AttestationCertificate {
    der: Vec<u8>,
    signing_key: SigningKey,
}

impl AttestationCertificate {
    /// Self-sign a certificate from `params` with a fresh P-256 key.
    pub fn from_params(params: CertificateParams) -> anyhow::Result<Self> {
        let key_pair = KeyPair::generate()?;
        let certificate = params.self_signed(&key_pair)?;
        let signing_key = <SigningKey as p256::pkcs8::DecodePrivateKey>::from_pkcs8_der(
            &key_pair.serialize_der(),
        )?;
        Ok(Self {
            der: certificate.der().to_vec(),
            signing_key,
        })
    }

    /// A certificate meeting every `packed` requirement, carrying `aaguid` in
    /// the FIDO AAGUID extension.
    pub fn packed(aaguid: &[u8; 16]) -> anyhow::Result<Self> {
        let mut params = packed_certificate_params()?;
        params.custom_extensions.push(aaguid_extension(aaguid));
        Self::from_params(params)
    }

    /// A plain U2F device certificate.
    pub fn fido_u2f() -> anyhow::Result<Self> {
        let mut params = CertificateParams::new(Vec::<String>::new())?;
        params
            .distinguished_name
            .push(DnType::CommonName, "Keyward U2F Test Device");
        Self::from_params(params)
    }

    /// The DER certificate.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Sign with the certified key.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: DerSignature = self.signing_key.sign(data);
        signature.as_bytes().to_vec()
    }
}

/// Subject and constraints of a conforming `packed` attestation certificate.
pub fn packed_certificate_params() -> anyhow::Result<CertificateParams> {
    let mut params = CertificateParams::new(Vec::<String>::new())?;
    params.distinguished_name.push(DnType::CountryName, "SE");
    params
        .distinguished_name
        .push(DnType::OrganizationName, "Keyward Test Vendor");
    params
        .distinguished_name
        .push(DnType::OrganizationalUnitName, "Authenticator Attestation");
    params
        .distinguished_name
        .push(DnType::CommonName, "Keyward Test Attestation");
    params.is_ca = IsCa::ExplicitNoCa;
    Ok(params)
}

/// The non-critical FIDO AAGUID extension.
pub fn aaguid_extension(aaguid: &[u8; 16]) -> CustomExtension {
    let mut content = vec![0x04, 0x10];
    content.extend_from_slice(aaguid);
    CustomExtension::from_oid_content(&[1, 3, 6, 1, 4, 1, 45724, 1, 1, 4], content)
}

/// A deterministic P-256 authenticator holding a single credential.
#[derive(Debug, Clone)]
pub struct SoftAuthenticator {
    rp_id_hash: [u8; 32],
    signing_key: SigningKey,
    credential_id: Vec<u8>,
    aaguid: [u8; 16],
    user_present: bool,
}

impl SoftAuthenticator {
    /// An authenticator scoped to `rp_id` whose key is derived from `seed`.
    pub fn new(rp_id: &str, seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::random(&mut ChaCha20Rng::from_seed(seed));
        let public_key = signing_key.verifying_key().to_encoded_point(true);
        let credential_id = Sha256::digest(public_key.as_bytes()).to_vec();
        Self {
            rp_id_hash: Sha256::digest(rp_id.as_bytes()).into(),
            signing_key,
            credential_id,
            aaguid: SOFT_AUTHENTICATOR_AAGUID,
            user_present: true,
        }
    }

    /// Use another credential id.
    pub fn with_credential_id(mut self, credential_id: Vec<u8>) -> Self {
        self.credential_id = credential_id;
        self
    }

    /// Report another AAGUID.
    pub fn with_aaguid(mut self, aaguid: [u8; 16]) -> Self {
        self.aaguid = aaguid;
        self
    }

    /// Clear the user-present flag in everything produced from now on.
    pub fn without_user_presence(mut self) -> Self {
        self.user_present = false;
        self
    }

    /// The credential id.
    pub fn credential_id(&self) -> &[u8] {
        &self.credential_id
    }

    /// The AAGUID.
    pub fn aaguid(&self) -> [u8; 16] {
        self.aaguid
    }

    /// The credential public key as a raw uncompressed point.
    pub fn public_key(&self) -> [u8; RAW_POINT_LEN] {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let mut raw = [0u8; RAW_POINT_LEN];
        raw.copy_from_slice(point.as_bytes());
        raw
    }

    /// The credential public key as a COSE_Key.
    pub fn cose_key(&self) -> CoseKey {
        let raw = self.public_key();
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&raw[1..33]);
        y.copy_from_slice(&raw[33..]);
        CoseKey::p256(x, y)
    }

    fn flags(&self, attested: bool) -> AuthenticatorFlags {
        let mut flags = 0;
        if self.user_present {
            flags |= AuthenticatorFlags::USER_PRESENT;
        }
        if attested {
            flags |= AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA;
        }
        AuthenticatorFlags(flags)
    }

    /// Make-credential authenticator data with counter `sign_count`.
    pub fn registration_data(&self, sign_count: u32) -> anyhow::Result<Vec<u8>> {
        let cose_key = self.cose_key();
        let data = AuthenticatorData {
            rp_id_hash: self.rp_id_hash,
            flags: self.flags(true),
            sign_count,
            attested_credential: Some(AttestedCredentialData {
                aaguid: self.aaguid,
                credential_id: self.credential_id.clone(),
                credential_public_key: cose_key.to_cbor()?,
                cose_key,
            }),
            extensions: None,
        };
        Ok(data.to_bytes()?)
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: DerSignature = self.signing_key.sign(data);
        signature.as_bytes().to_vec()
    }

    fn attestation_object(
        fmt: &str,
        att_stmt: AttestationStatement,
        auth_data: Vec<u8>,
    ) -> anyhow::Result<Vec<u8>> {
        let object = AttestationObject {
            fmt: fmt.to_string(),
            att_stmt,
            auth_data,
        };
        Ok(object.to_cbor()?)
    }

    /// A `none` attestation object.
    pub fn attest_none(&self, _client_data_json: &[u8]) -> anyhow::Result<Vec<u8>> {
        let auth_data = self.registration_data(0)?;
        Self::attestation_object("none", AttestationStatement::default(), auth_data)
    }

    /// A `packed` self-attestation object.
    pub fn attest_self(&self, client_data_json: &[u8]) -> anyhow::Result<Vec<u8>> {
        let auth_data = self.registration_data(0)?;
        let client_data_hash = client_data_hash(client_data_json);
        let parts: [&[u8]; 2] = [&auth_data, &client_data_hash];
        let base = parts.concat();
        let statement = AttestationStatement {
            alg: Some(COSE_ALG_ES256),
            sig: Some(self.sign(&base)),
            x5c: None,
        };
        Self::attestation_object("packed", statement, auth_data)
    }

    /// A `packed` attestation object signed by `certificate`.
    pub fn attest_packed(
        &self,
        client_data_json: &[u8],
        certificate: &AttestationCertificate,
    ) -> anyhow::Result<Vec<u8>> {
        let auth_data = self.registration_data(0)?;
        let client_data_hash = client_data_hash(client_data_json);
        let parts: [&[u8]; 2] = [&auth_data, &client_data_hash];
        let base = parts.concat();
        let statement = AttestationStatement {
            alg: Some(COSE_ALG_ES256),
            sig: Some(certificate.sign(&base)),
            x5c: Some(vec![certificate.der().to_vec()]),
        };
        Self::attestation_object("packed", statement, auth_data)
    }

    /// A `fido-u2f` attestation object signed by `certificate`.
    pub fn attest_fido_u2f(
        &self,
        client_data_json: &[u8],
        certificate: &AttestationCertificate,
    ) -> anyhow::Result<Vec<u8>> {
        let auth_data = self.registration_data(0)?;
        let client_data_hash = client_data_hash(client_data_json);
        let public_key = self.public_key();
        let parts: [&[u8]; 5] = [
            &[0x00],
            &self.rp_id_hash,
            &client_data_hash,
            &self.credential_id,
            &public_key,
        ];
        let statement = AttestationStatement {
            alg: None,
            sig: Some(certificate.sign(&parts.concat())),
            x5c: Some(vec![certificate.der().to_vec()]),
        };
        Self::attestation_object("fido-u2f", statement, auth_data)
    }

    /// An assertion over `client_data_json` carrying counter `sign_count`.
    pub fn assert(&self, client_data_json: &[u8], sign_count: u32) -> AssertionResponse {
        // Without attested credential data nothing can overflow a length prefix.
        let data = AuthenticatorData {
            rp_id_hash: self.rp_id_hash,
            flags: self.flags(false),
            sign_count,
            attested_credential: None,
            extensions: None,
        }
        .to_bytes()
        .unwrap_or_default();
        let client_data_hash = client_data_hash(client_data_json);
        let parts: [&[u8]; 2] = [&data, &client_data_hash];
        let base = parts.concat();

        AssertionResponse {
            signature: self.sign(&base),
            authenticator_data: data,
            client_data_json: client_data_json.to_vec(),
            user_handle: None,
        }
    }

    /// Wrap an attestation object into the JSON credential a browser posts.
    pub fn registration_credential(
        &self,
        client_data_json: Vec<u8>,
        attestation_object: Vec<u8>,
    ) -> RegistrationCredential {
        RegistrationCredential {
            id: base64url::encode(&self.credential_id),
            raw_id: self.credential_id.clone(),
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            response: AttestationResponse {
                client_data_json,
                attestation_object,
            },
        }
    }

    /// Sign an assertion and wrap it into the JSON credential a browser posts.
    pub fn assertion_credential(
        &self,
        client_data_json: &[u8],
        sign_count: u32,
    ) -> AssertionCredential {
        AssertionCredential {
            id: base64url::encode(&self.credential_id),
            raw_id: self.credential_id.clone(),
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            response: self.assert(client_data_json, sign_count),
        }
    }
}
