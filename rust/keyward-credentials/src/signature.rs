//! Signature verification against a PEM public key or certificate.
//!
//! The scheme follows the key: a P-256 `id-ecPublicKey` verifies DER-encoded
//! ECDSA/SHA-256 signatures (ES256), an `rsaEncryption` key verifies
//! RSASSA-PKCS1-v1_5/SHA-256 signatures (RS256). Both verifiers hash the
//! signed data with SHA-256 themselves.
//!
//! A bad signature is an answer, not an error: [`verify_signature`] returns
//! `Ok(false)` for it and reserves `Err` for key material it cannot read.

use keyward_encoding::{CERTIFICATE_LABEL, PUBLIC_KEY_LABEL, ParseError, Pem};
use sha2::Sha256;
use signature::Verifier as _;
use x509_parser::prelude::{FromDer, SubjectPublicKeyInfo};

const EC_PUBLIC_KEY_OID: &str = "1.2.840.10045.2.1";
const RSA_ENCRYPTION_OID: &str = "1.2.840.113549.1.1.1";

/// A public key able to check attestation or assertion signatures.
#[derive(Debug, Clone)]
pub enum PublicKey {
    /// ES256.
    P256(p256::ecdsa::VerifyingKey),
    /// RS256.
    Rsa(rsa::RsaPublicKey),
}

impl PublicKey {
    /// Read a key from PEM text framed as `PUBLIC KEY` or `CERTIFICATE`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Pem`] for bad framing or another label, and the
    /// errors of [`PublicKey::from_spki_der`] for the key itself.
    pub fn from_pem(text: &str) -> Result<Self, ParseError> {
        let pem = Pem::parse(text)?;
        match pem.label.as_str() {
            PUBLIC_KEY_LABEL => Self::from_spki_der(&pem.der),
            CERTIFICATE_LABEL => Self::from_certificate_der(&pem.der),
            other => Err(ParseError::Pem(format!("unexpected label {other:?}"))),
        }
    }

    /// Read the subject public key of a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Certificate`] when `der` is not a certificate.
    pub fn from_certificate_der(der: &[u8]) -> Result<Self, ParseError> {
        let (_, certificate) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| ParseError::Certificate(e.to_string()))?;
        Self::from_spki_der(certificate.tbs_certificate.subject_pki.raw)
    }

    /// Read a DER SubjectPublicKeyInfo.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::KeyMaterial`] for malformed keys and for keys
    /// that are neither P-256 nor RSA.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, ParseError> {
        let (_, spki) = SubjectPublicKeyInfo::from_der(der)
            .map_err(|e| ParseError::KeyMaterial(e.to_string()))?;

        match spki.algorithm.algorithm.to_id_string().as_str() {
            EC_PUBLIC_KEY_OID => {
                <p256::ecdsa::VerifyingKey as p256::pkcs8::DecodePublicKey>::from_public_key_der(
                    der,
                )
                .map(PublicKey::P256)
                .map_err(|e| ParseError::KeyMaterial(format!("bad P-256 public key: {e}")))
            }
            RSA_ENCRYPTION_OID => {
                <rsa::RsaPublicKey as rsa::pkcs8::DecodePublicKey>::from_public_key_der(der)
                    .map(PublicKey::Rsa)
                    .map_err(|e| ParseError::KeyMaterial(format!("bad RSA public key: {e}")))
            }
            other => Err(ParseError::KeyMaterial(format!(
                "unsupported key algorithm {other}"
            ))),
        }
    }

    /// Check `signature` over `data`.
    pub fn verify(&self, signature: &[u8], data: &[u8]) -> bool {
        match self {
            PublicKey::P256(key) => match p256::ecdsa::DerSignature::from_bytes(signature) {
                Ok(signature) => key.verify(data, &signature).is_ok(),
                Err(_) => false,
            },
            PublicKey::Rsa(key) => {
                let key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone());
                match rsa::pkcs1v15::Signature::try_from(signature) {
                    Ok(signature) => key.verify(data, &signature).is_ok(),
                    Err(_) => false,
                }
            }
        }
    }
}

/// Verify `signature` over `data` with the key in `pem`.
///
/// # Errors
///
/// Only malformed PEM or key material is an error. A signature that does not
/// verify is `Ok(false)`.
pub fn verify_signature(signature: &[u8], data: &[u8], pem: &str) -> Result<bool, ParseError> {
    Ok(PublicKey::from_pem(pem)?.verify(signature, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_encoding::to_pem;
    use p256::ecdsa::{DerSignature, SigningKey, signature::Signer as _};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use signature::SignatureEncoding as _;
    use testresult::TestResult;

    fn p256_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32].into()).unwrap()
    }

    fn raw_point(key: &SigningKey) -> Vec<u8> {
        key.verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn it_verifies_es256_against_a_raw_point_pem() -> TestResult {
        let key = p256_key();
        let signature: DerSignature = key.sign(b"signed data");
        let pem = to_pem(&raw_point(&key));

        assert!(verify_signature(signature.as_bytes(), b"signed data", &pem)?);
        assert!(!verify_signature(signature.as_bytes(), b"other data", &pem)?);
        Ok(())
    }

    #[test]
    fn it_returns_false_for_undecodable_signatures() -> TestResult {
        let pem = to_pem(&raw_point(&p256_key()));

        assert!(!verify_signature(&[], b"data", &pem)?);
        assert!(!verify_signature(&[0x30, 0x02, 0x01], b"data", &pem)?);
        Ok(())
    }

    #[test]
    fn it_rejects_malformed_key_material_as_a_parse_error() {
        let not_pem = verify_signature(&[], b"data", "hello");
        assert!(matches!(not_pem, Err(ParseError::Pem(_))));

        let bad_point = to_pem(&[0x04; 65]);
        assert!(matches!(
            verify_signature(&[], b"data", &bad_point),
            Err(ParseError::KeyMaterial(_))
        ));

        let not_a_certificate = to_pem(&[0x30, 0x03, 0x02, 0x01, 0x00]);
        assert!(matches!(
            verify_signature(&[], b"data", &not_a_certificate),
            Err(ParseError::Certificate(_))
        ));
    }

    #[test]
    fn it_verifies_es256_against_a_certificate() -> TestResult {
        let key_pair = rcgen::KeyPair::generate()?;
        let params = rcgen::CertificateParams::new(vec!["attestation.test".to_string()])?;
        let certificate = params.self_signed(&key_pair)?;
        let signing_key = <SigningKey as p256::pkcs8::DecodePrivateKey>::from_pkcs8_der(
            &key_pair.serialize_der(),
        )?;

        let signature: DerSignature = signing_key.sign(b"attested");
        let pem = to_pem(certificate.der());

        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(verify_signature(signature.as_bytes(), b"attested", &pem)?);
        assert!(!verify_signature(signature.as_bytes(), b"attested!", &pem)?);
        Ok(())
    }

    #[test]
    fn it_verifies_rs256() -> TestResult {
        use rsa::pkcs8::EncodePublicKey as _;

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let private_key = rsa::RsaPrivateKey::new(&mut rng, 2048)?;
        let spki = private_key.to_public_key().to_public_key_der()?;
        let pem = Pem::new(PUBLIC_KEY_LABEL, spki.as_bytes().to_vec()).encode();

        let signer = rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key);
        let signature = signer.sign(b"rs256 payload").to_vec();

        assert!(verify_signature(&signature, b"rs256 payload", &pem)?);
        assert!(!verify_signature(&signature, b"rs256 payload?", &pem)?);
        assert!(!verify_signature(&signature[1..], b"rs256 payload", &pem)?);
        Ok(())
    }
}
