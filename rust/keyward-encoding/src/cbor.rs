//! Small helpers over `ciborium::Value` maps.

use crate::ParseError;
use ciborium::value::Value;

/// Decode one CBOR item from the front of `bytes`, returning it together with
/// the number of bytes it occupied.
pub(crate) fn decode_prefix(bytes: &[u8]) -> Result<(Value, usize), ParseError> {
    let mut rest = bytes;
    let value: Value =
        ciborium::from_reader(&mut rest).map_err(|e| ParseError::Cbor(e.to_string()))?;
    Ok((value, bytes.len() - rest.len()))
}

/// Decode a buffer that must hold exactly one CBOR item.
pub(crate) fn decode_exact(bytes: &[u8], what: &'static str) -> Result<Value, ParseError> {
    let (value, used) = decode_prefix(bytes)?;
    if used != bytes.len() {
        return Err(ParseError::TrailingBytes(bytes.len() - used, what));
    }
    Ok(value)
}

pub(crate) fn encode(value: &Value) -> Result<Vec<u8>, ParseError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| ParseError::Cbor(e.to_string()))?;
    Ok(buf)
}

pub(crate) fn as_map<'a>(
    value: &'a Value,
    what: &'static str,
) -> Result<&'a [(Value, Value)], ParseError> {
    match value {
        Value::Map(entries) => Ok(entries),
        _ => Err(ParseError::UnexpectedType(what)),
    }
}

pub(crate) fn get_int_key(map: &[(Value, Value)], key: i64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == i128::from(key)))
        .map(|(_, v)| v)
}

pub(crate) fn get_text_key<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
        .map(|(_, v)| v)
}

pub(crate) fn as_i64(value: &Value, what: &'static str) -> Result<i64, ParseError> {
    match value {
        Value::Integer(i) => i64::try_from(*i).map_err(|_| ParseError::UnexpectedType(what)),
        _ => Err(ParseError::UnexpectedType(what)),
    }
}

pub(crate) fn as_bytes<'a>(value: &'a Value, what: &'static str) -> Result<&'a [u8], ParseError> {
    match value {
        Value::Bytes(b) => Ok(b),
        _ => Err(ParseError::UnexpectedType(what)),
    }
}

pub(crate) fn as_text<'a>(value: &'a Value, what: &'static str) -> Result<&'a str, ParseError> {
    match value {
        Value::Text(s) => Ok(s),
        _ => Err(ParseError::UnexpectedType(what)),
    }
}

pub(crate) fn as_array<'a>(value: &'a Value, what: &'static str) -> Result<&'a [Value], ParseError> {
    match value {
        Value::Array(a) => Ok(a),
        _ => Err(ParseError::UnexpectedType(what)),
    }
}

pub(crate) fn int(value: i64) -> Value {
    Value::Integer(value.into())
}
