//! COSE_Key (RFC 9052) decoding for EC2 public keys.
//!
//! Labels below zero are specific to the key type, so they are only read as
//! EC2 parameters when `kty` is EC2 or absent. Other key types keep `kty` and
//! `alg` and leave the EC2 fields empty.
//!
//! ```text
//! label  name  EC2 meaning
//!   1    kty   key type (2 = EC2)
//!   3    alg   algorithm (-7 = ES256)
//!  -1    crv   curve (1 = P-256)
//!  -2    x     x coordinate, bstr
//!  -3    y     y coordinate, bstr
//! ```

use crate::{ParseError, cbor};
use ciborium::value::Value;

/// COSE key type for elliptic-curve keys with x and y coordinates.
pub const COSE_KTY_EC2: i64 = 2;
/// COSE curve identifier for NIST P-256.
pub const COSE_CRV_P256: i64 = 1;
/// COSE algorithm identifier for ECDSA with SHA-256.
pub const COSE_ALG_ES256: i64 = -7;
/// COSE algorithm identifier for RSASSA-PKCS1-v1_5 with SHA-256.
pub const COSE_ALG_RS256: i64 = -257;

const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
const LABEL_CRV: i64 = -1;
const LABEL_X: i64 = -2;
const LABEL_Y: i64 = -3;

/// Length of one P-256 coordinate.
pub const P256_COORDINATE_LEN: usize = 32;

/// Length of an uncompressed SEC1 P-256 point (`0x04 || x || y`).
pub const RAW_POINT_LEN: usize = 1 + 2 * P256_COORDINATE_LEN;

/// A decoded COSE_Key. Unknown labels are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoseKey {
    /// Key type (label 1).
    pub kty: Option<i64>,
    /// Algorithm (label 3).
    pub alg: Option<i64>,
    /// Curve (label -1).
    pub crv: Option<i64>,
    /// x coordinate (label -2).
    pub x: Option<Vec<u8>>,
    /// y coordinate (label -3).
    pub y: Option<Vec<u8>>,
}

impl CoseKey {
    /// An ES256 P-256 key built from its coordinates.
    pub fn p256(x: [u8; 32], y: [u8; 32]) -> Self {
        Self {
            kty: Some(COSE_KTY_EC2),
            alg: Some(COSE_ALG_ES256),
            crv: Some(COSE_CRV_P256),
            x: Some(x.to_vec()),
            y: Some(y.to_vec()),
        }
    }

    /// Decode a buffer holding exactly one COSE_Key map.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, ParseError> {
        let value = cbor::decode_exact(bytes, "COSE key")?;
        Self::from_value(&value)
    }

    /// Decode a COSE_Key from the front of `bytes`, returning the key and the
    /// number of bytes it occupied.
    pub fn decode_prefix(bytes: &[u8]) -> Result<(Self, usize), ParseError> {
        let (value, used) = cbor::decode_prefix(bytes)?;
        Ok((Self::from_value(&value)?, used))
    }

    fn from_value(value: &Value) -> Result<Self, ParseError> {
        let map = cbor::as_map(value, "COSE key")?;
        let int = |label, what| {
            cbor::get_int_key(map, label)
                .map(|v| cbor::as_i64(v, what))
                .transpose()
        };
        let bytes = |label, what| {
            cbor::get_int_key(map, label)
                .map(|v| cbor::as_bytes(v, what).map(<[u8]>::to_vec))
                .transpose()
        };
        let kty = int(LABEL_KTY, "COSE kty")?;
        let alg = int(LABEL_ALG, "COSE alg")?;
        if kty.is_some_and(|kty| kty != COSE_KTY_EC2) {
            return Ok(Self {
                kty,
                alg,
                ..Self::default()
            });
        }
        Ok(Self {
            kty,
            alg,
            crv: int(LABEL_CRV, "COSE crv")?,
            x: bytes(LABEL_X, "COSE x coordinate")?,
            y: bytes(LABEL_Y, "COSE y coordinate")?,
        })
    }

    /// Encode as a CBOR map, labels in canonical order.
    pub fn to_cbor(&self) -> Result<Vec<u8>, ParseError> {
        let mut entries = Vec::with_capacity(5);
        if let Some(kty) = self.kty {
            entries.push((cbor::int(LABEL_KTY), cbor::int(kty)));
        }
        if let Some(alg) = self.alg {
            entries.push((cbor::int(LABEL_ALG), cbor::int(alg)));
        }
        if let Some(crv) = self.crv {
            entries.push((cbor::int(LABEL_CRV), cbor::int(crv)));
        }
        if let Some(x) = &self.x {
            entries.push((cbor::int(LABEL_X), Value::Bytes(x.clone())));
        }
        if let Some(y) = &self.y {
            entries.push((cbor::int(LABEL_Y), Value::Bytes(y.clone())));
        }
        cbor::encode(&Value::Map(entries))
    }

    /// The uncompressed SEC1 point `0x04 || x || y`.
    ///
    /// # Errors
    ///
    /// Fails when either coordinate is missing or is not 32 bytes long.
    pub fn to_raw_point(&self) -> Result<[u8; RAW_POINT_LEN], ParseError> {
        let x = coordinate(self.x.as_deref(), LABEL_X, "COSE x coordinate")?;
        let y = coordinate(self.y.as_deref(), LABEL_Y, "COSE y coordinate")?;

        let mut point = [0u8; RAW_POINT_LEN];
        point[0] = 0x04;
        point[1..1 + P256_COORDINATE_LEN].copy_from_slice(x);
        point[1 + P256_COORDINATE_LEN..].copy_from_slice(y);
        Ok(point)
    }
}

fn coordinate<'a>(
    value: Option<&'a [u8]>,
    label: i64,
    what: &'static str,
) -> Result<&'a [u8], ParseError> {
    let value = value.ok_or(ParseError::MissingField(what))?;
    if value.len() != P256_COORDINATE_LEN {
        return Err(ParseError::CoordinateLength {
            label,
            expected: P256_COORDINATE_LEN,
            actual: value.len(),
        });
    }
    Ok(value)
}

/// Convert an encoded COSE_Key straight to its raw uncompressed point.
pub fn cose_key_to_raw_point(cose_key: &[u8]) -> Result<[u8; RAW_POINT_LEN], ParseError> {
    CoseKey::from_cbor(cose_key)?.to_raw_point()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn it_builds_an_uncompressed_point() {
        let key = CoseKey::p256([0xaa; 32], [0xbb; 32]).to_cbor().unwrap();
        let point = cose_key_to_raw_point(&key).unwrap();

        assert_eq!(point[0], 0x04);
        assert_eq!(&point[1..33], &[0xaa; 32]);
        assert_eq!(&point[33..65], &[0xbb; 32]);
    }

    #[test]
    fn it_rejects_a_missing_y_coordinate() {
        let mut key = CoseKey::p256([1; 32], [2; 32]);
        key.y = None;
        let encoded = key.to_cbor().unwrap();

        assert_eq!(
            cose_key_to_raw_point(&encoded),
            Err(ParseError::MissingField("COSE y coordinate"))
        );
    }

    #[test]
    fn it_rejects_a_short_coordinate() {
        let mut key = CoseKey::p256([1; 32], [2; 32]);
        key.x = Some(vec![1; 31]);
        let encoded = key.to_cbor().unwrap();

        assert_eq!(
            cose_key_to_raw_point(&encoded),
            Err(ParseError::CoordinateLength {
                label: -2,
                expected: 32,
                actual: 31
            })
        );
    }

    #[test]
    fn it_rejects_a_compressed_y_flag() {
        let encoded = cbor::encode(&Value::Map(vec![
            (cbor::int(-2), Value::Bytes(vec![1; 32])),
            (cbor::int(-3), Value::Bool(true)),
        ]))
        .unwrap();

        assert_eq!(
            CoseKey::from_cbor(&encoded),
            Err(ParseError::UnexpectedType("COSE y coordinate"))
        );
    }

    #[test]
    fn it_keeps_only_kty_and_alg_of_an_rsa_key() {
        // kty 3 (RSA), alg RS256, -1 is the modulus and -2 the exponent.
        let encoded = cbor::encode(&Value::Map(vec![
            (cbor::int(1), cbor::int(3)),
            (cbor::int(3), cbor::int(COSE_ALG_RS256)),
            (cbor::int(-1), Value::Bytes(vec![0xc5; 256])),
            (cbor::int(-2), Value::Bytes(vec![0x01, 0x00, 0x01])),
        ]))
        .unwrap();

        assert_eq!(
            CoseKey::from_cbor(&encoded),
            Ok(CoseKey {
                kty: Some(3),
                alg: Some(COSE_ALG_RS256),
                ..CoseKey::default()
            })
        );
    }

    #[test]
    fn it_fails_on_malformed_cbor() {
        // Map header announcing two entries, followed by nothing.
        assert!(matches!(
            CoseKey::from_cbor(&[0xa2]),
            Err(ParseError::Cbor(_))
        ));
        // A CBOR array is not a key.
        assert_eq!(
            CoseKey::from_cbor(&[0x80]),
            Err(ParseError::UnexpectedType("COSE key"))
        );
    }

    #[test]
    fn it_reports_trailing_bytes() {
        let mut encoded = CoseKey::p256([1; 32], [2; 32]).to_cbor().unwrap();
        encoded.push(0x00);
        assert_eq!(
            CoseKey::from_cbor(&encoded),
            Err(ParseError::TrailingBytes(1, "COSE key"))
        );

        let (_, used) = CoseKey::decode_prefix(&encoded).unwrap();
        assert_eq!(used, encoded.len() - 1);
    }

    proptest! {
        #[test]
        fn raw_point_preserves_coordinates(x in any::<[u8; 32]>(), y in any::<[u8; 32]>()) {
            let encoded = CoseKey::p256(x, y).to_cbor().unwrap();
            let point = cose_key_to_raw_point(&encoded).unwrap();

            prop_assert_eq!(&point[1..33], &x[..]);
            prop_assert_eq!(&point[33..65], &y[..]);
        }
    }
}
