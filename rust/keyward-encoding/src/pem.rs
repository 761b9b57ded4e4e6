//! PEM framing for raw P-256 points and DER certificates.

use crate::{ParseError, RAW_POINT_LEN};
use base64::{Engine, engine::general_purpose::STANDARD};

/// PEM label for a SubjectPublicKeyInfo.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
/// PEM label for an X.509 certificate.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// DER prefix that turns a raw uncompressed P-256 point into a
/// SubjectPublicKeyInfo:
///
/// ```text
/// SEQUENCE {
///   SEQUENCE {
///     OBJECT IDENTIFIER 1.2.840.10045.2.1   (ecPublicKey)
///     OBJECT IDENTIFIER 1.2.840.10045.3.1.7 (P-256)
///   }
///   BIT STRING (66 bytes, 0 unused bits) <point follows>
/// }
/// ```
pub const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08,
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];

const LINE_WIDTH: usize = 64;

/// A decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pem {
    /// The label between `BEGIN`/`END`, e.g. `PUBLIC KEY`.
    pub label: String,
    /// The DER body.
    pub der: Vec<u8>,
}

impl Pem {
    /// Frame `der` under `label`.
    pub fn new(label: impl Into<String>, der: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            der,
        }
    }

    /// Render with 64-column base64 lines, each terminated by `\n`.
    pub fn encode(&self) -> String {
        let body = STANDARD.encode(&self.der);
        let mut out = String::with_capacity(body.len() + body.len() / LINE_WIDTH + 64);
        out.push_str(&format!("-----BEGIN {}-----\n", self.label));
        for line in body.as_bytes().chunks(LINE_WIDTH) {
            // base64 output is ASCII, so chunking on bytes never splits a char.
            out.push_str(std::str::from_utf8(line).unwrap_or_default());
            out.push('\n');
        }
        out.push_str(&format!("-----END {}-----\n", self.label));
        out
    }

    /// Parse a single PEM block. Surrounding whitespace is ignored; the END
    /// label must match the BEGIN label.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut lines = text.trim().lines().map(str::trim);

        let begin = lines
            .next()
            .ok_or_else(|| ParseError::Pem("empty input".into()))?;
        let label = begin
            .strip_prefix("-----BEGIN ")
            .and_then(|rest| rest.strip_suffix("-----"))
            .ok_or_else(|| ParseError::Pem("missing BEGIN line".into()))?;

        let mut body = String::new();
        let mut closed = false;
        for line in lines.by_ref() {
            if let Some(end) = line
                .strip_prefix("-----END ")
                .and_then(|rest| rest.strip_suffix("-----"))
            {
                if end != label {
                    return Err(ParseError::Pem(format!(
                        "BEGIN {label} closed by END {end}"
                    )));
                }
                closed = true;
                break;
            }
            body.push_str(line);
        }
        if !closed {
            return Err(ParseError::Pem("missing END line".into()));
        }
        if lines.next().is_some() {
            return Err(ParseError::Pem("data after END line".into()));
        }

        let der = STANDARD.decode(body.as_bytes())?;
        Ok(Self::new(label, der))
    }
}

/// Whether `bytes` look like a raw uncompressed P-256 point.
pub fn is_raw_point(bytes: &[u8]) -> bool {
    bytes.len() == RAW_POINT_LEN && bytes[0] == 0x04
}

/// Wrap a raw uncompressed P-256 point into SubjectPublicKeyInfo DER.
pub fn raw_point_to_spki(point: &[u8]) -> Vec<u8> {
    let mut der = Vec::with_capacity(P256_SPKI_PREFIX.len() + point.len());
    der.extend_from_slice(&P256_SPKI_PREFIX);
    der.extend_from_slice(point);
    der
}

/// PEM-encode a raw public key point or a DER certificate.
///
/// A 65-byte buffer starting with `0x04` is treated as a raw P-256 point and
/// emitted as a `PUBLIC KEY`; anything else is emitted as a `CERTIFICATE`.
pub fn to_pem(bytes: &[u8]) -> String {
    if is_raw_point(bytes) {
        Pem::new(PUBLIC_KEY_LABEL, raw_point_to_spki(bytes)).encode()
    } else {
        Pem::new(CERTIFICATE_LABEL, bytes.to_vec()).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn it_frames_a_raw_point_as_a_public_key() {
        let mut point = [0x11u8; 65];
        point[0] = 0x04;
        let pem = to_pem(&point);

        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----\n"));
        assert!(pem.ends_with("-----END PUBLIC KEY-----\n"));
        // 91 DER bytes encode to 124 base64 characters: 64 + 60.
        let body: Vec<&str> = pem.lines().skip(1).take(2).collect();
        assert_eq!(body[0].len(), 64);
        assert_eq!(body[1].len(), 60);
    }

    #[test]
    fn it_frames_other_lengths_as_a_certificate() {
        let mut point = [0x11u8; 65];
        point[0] = 0x03;
        assert!(to_pem(&point).starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(to_pem(&[0x04; 64]).starts_with("-----BEGIN CERTIFICATE-----\n"));
    }

    #[test]
    fn it_rejects_mismatched_labels() {
        let pem = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END PUBLIC KEY-----\n";
        assert!(matches!(Pem::parse(pem), Err(ParseError::Pem(_))));
    }

    #[test]
    fn it_rejects_missing_framing() {
        assert!(matches!(Pem::parse(""), Err(ParseError::Pem(_))));
        assert!(matches!(Pem::parse("AAAA"), Err(ParseError::Pem(_))));
        assert!(matches!(
            Pem::parse("-----BEGIN CERTIFICATE-----\nAAAA\n"),
            Err(ParseError::Pem(_))
        ));
    }

    #[test]
    fn it_rejects_a_corrupt_body() {
        let pem = "-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n";
        assert!(matches!(Pem::parse(pem), Err(ParseError::Base64(_))));
    }

    proptest! {
        #[test]
        fn raw_points_survive_the_round_trip(tail in proptest::collection::vec(any::<u8>(), 64)) {
            let mut point = vec![0x04];
            point.extend_from_slice(&tail);

            let parsed = Pem::parse(&to_pem(&point)).unwrap();
            prop_assert_eq!(parsed.label.as_str(), PUBLIC_KEY_LABEL);
            prop_assert_eq!(&parsed.der[..26], &P256_SPKI_PREFIX[..]);
            prop_assert_eq!(&parsed.der[26..], &point[..]);
        }

        #[test]
        fn certificates_survive_the_round_trip(der in proptest::collection::vec(any::<u8>(), 0..700)) {
            prop_assume!(!is_raw_point(&der));

            let parsed = Pem::parse(&to_pem(&der)).unwrap();
            prop_assert_eq!(parsed.label.as_str(), CERTIFICATE_LABEL);
            prop_assert_eq!(parsed.der, der);
        }
    }
}
