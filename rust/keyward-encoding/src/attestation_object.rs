//! The CBOR attestation object returned by `navigator.credentials.create()`.
//!
//! ```text
//! {
//!   "fmt": tstr,
//!   "attStmt": { ? "alg": int, ? "sig": bstr, ? "x5c": [+ bstr] },
//!   "authData": bstr,
//! }
//! ```

use crate::{ParseError, cbor};
use ciborium::value::Value;

/// The format-specific attestation statement.
///
/// Only the members used by the `fido-u2f`, `packed` and `none` formats are
/// modelled; anything else in the map is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestationStatement {
    /// COSE algorithm of `sig` (packed only).
    pub alg: Option<i64>,
    /// The attestation signature.
    pub sig: Option<Vec<u8>>,
    /// DER certificates, attestation certificate first. `None` when the
    /// member is absent, which is how packed self-attestation is signalled.
    pub x5c: Option<Vec<Vec<u8>>>,
}

/// A decoded attestation object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationObject {
    /// Attestation statement format identifier.
    pub fmt: String,
    /// Format-specific statement.
    pub att_stmt: AttestationStatement,
    /// Raw authenticator data.
    pub auth_data: Vec<u8>,
}

impl AttestationObject {
    /// Decode a buffer that holds exactly one attestation object.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, ParseError> {
        let value = cbor::decode_exact(bytes, "attestation object")?;
        let map = cbor::as_map(&value, "attestation object")?;

        let fmt = cbor::get_text_key(map, "fmt").ok_or(ParseError::MissingField("fmt"))?;
        let fmt = cbor::as_text(fmt, "fmt")?.to_string();

        let auth_data =
            cbor::get_text_key(map, "authData").ok_or(ParseError::MissingField("authData"))?;
        let auth_data = cbor::as_bytes(auth_data, "authData")?.to_vec();

        let statement =
            cbor::get_text_key(map, "attStmt").ok_or(ParseError::MissingField("attStmt"))?;
        let att_stmt = AttestationStatement::from_value(statement)?;

        Ok(Self {
            fmt,
            att_stmt,
            auth_data,
        })
    }

    /// Encode to CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>, ParseError> {
        cbor::encode(&Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text(self.fmt.clone())),
            (Value::Text("attStmt".into()), self.att_stmt.to_value()),
            (
                Value::Text("authData".into()),
                Value::Bytes(self.auth_data.clone()),
            ),
        ]))
    }
}

impl AttestationStatement {
    fn from_value(value: &Value) -> Result<Self, ParseError> {
        let map = cbor::as_map(value, "attStmt")?;

        let alg = cbor::get_text_key(map, "alg")
            .map(|v| cbor::as_i64(v, "attStmt.alg"))
            .transpose()?;
        let sig = cbor::get_text_key(map, "sig")
            .map(|v| cbor::as_bytes(v, "attStmt.sig").map(<[u8]>::to_vec))
            .transpose()?;
        let x5c = cbor::get_text_key(map, "x5c")
            .map(|v| {
                cbor::as_array(v, "attStmt.x5c")?
                    .iter()
                    .map(|cert| cbor::as_bytes(cert, "attStmt.x5c entry").map(<[u8]>::to_vec))
                    .collect::<Result<Vec<_>, ParseError>>()
            })
            .transpose()?;

        Ok(Self { alg, sig, x5c })
    }

    fn to_value(&self) -> Value {
        let mut entries = Vec::new();
        if let Some(alg) = self.alg {
            entries.push((Value::Text("alg".into()), cbor::int(alg)));
        }
        if let Some(sig) = &self.sig {
            entries.push((Value::Text("sig".into()), Value::Bytes(sig.clone())));
        }
        if let Some(x5c) = &self.x5c {
            entries.push((
                Value::Text("x5c".into()),
                Value::Array(x5c.iter().cloned().map(Value::Bytes).collect()),
            ));
        }
        Value::Map(entries)
    }

    /// The signature, which every signed format requires.
    pub fn signature(&self) -> Result<&[u8], ParseError> {
        self.sig.as_deref().ok_or(ParseError::MissingField("attStmt.sig"))
    }

    /// The attestation certificate, `x5c[0]`.
    pub fn attestation_certificate(&self) -> Result<&[u8], ParseError> {
        self.x5c
            .as_ref()
            .and_then(|chain| chain.first())
            .map(Vec::as_slice)
            .ok_or(ParseError::MissingField("attStmt.x5c[0]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    fn sample() -> AttestationObject {
        AttestationObject {
            fmt: "packed".into(),
            att_stmt: AttestationStatement {
                alg: Some(-7),
                sig: Some(vec![0x30, 0x01, 0x02]),
                x5c: Some(vec![vec![0xde, 0xad]]),
            },
            auth_data: vec![0u8; 37],
        }
    }

    #[test]
    fn it_decodes_what_it_encodes() -> TestResult {
        let object = sample();
        assert_eq!(AttestationObject::from_cbor(&object.to_cbor()?)?, object);
        Ok(())
    }

    #[test]
    fn it_distinguishes_absent_x5c_from_empty_x5c() -> TestResult {
        let mut object = sample();
        object.att_stmt.x5c = None;
        let decoded = AttestationObject::from_cbor(&object.to_cbor()?)?;
        assert_eq!(decoded.att_stmt.x5c, None);

        object.att_stmt.x5c = Some(vec![]);
        let decoded = AttestationObject::from_cbor(&object.to_cbor()?)?;
        assert_eq!(decoded.att_stmt.x5c, Some(vec![]));
        assert_eq!(
            decoded.att_stmt.attestation_certificate(),
            Err(ParseError::MissingField("attStmt.x5c[0]"))
        );
        Ok(())
    }

    #[test]
    fn it_rejects_missing_members() -> TestResult {
        let bytes = cbor::encode(&Value::Map(vec![(
            Value::Text("fmt".into()),
            Value::Text("none".into()),
        )]))?;
        assert_eq!(
            AttestationObject::from_cbor(&bytes),
            Err(ParseError::MissingField("authData"))
        );
        Ok(())
    }

    #[test]
    fn it_rejects_wrongly_typed_members() -> TestResult {
        let bytes = cbor::encode(&Value::Map(vec![
            (Value::Text("fmt".into()), cbor::int(1)),
            (Value::Text("attStmt".into()), Value::Map(vec![])),
            (Value::Text("authData".into()), Value::Bytes(vec![])),
        ]))?;
        assert_eq!(
            AttestationObject::from_cbor(&bytes),
            Err(ParseError::UnexpectedType("fmt"))
        );
        Ok(())
    }

    #[test]
    fn it_fails_on_truncated_and_padded_input() -> TestResult {
        let bytes = sample().to_cbor()?;
        assert!(matches!(
            AttestationObject::from_cbor(&bytes[..bytes.len() - 1]),
            Err(ParseError::Cbor(_))
        ));

        let mut padded = bytes.clone();
        padded.push(0xf6);
        assert_eq!(
            AttestationObject::from_cbor(&padded),
            Err(ParseError::TrailingBytes(1, "attestation object"))
        );
        Ok(())
    }
}
