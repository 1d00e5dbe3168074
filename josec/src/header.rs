use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  error::{JoseError, JoseResult},
  util::{b64url_decode, b64url_encode},
};

/// JOSE protected header: an order-preserving map from field name to a closed
/// JSON value variant.
///
/// Field order is kept as inserted so that serializing the header twice yields
/// byte-identical JSON, which in turn keeps the JWE AAD deterministic.
/// Recognized fields: `alg`, `enc`, `zip`, `kid`, `typ`, `b64`, `crit`, `iv`,
/// `tag`, `p2s`, `p2c`, `epk`, `apu`, `apv`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoseHeader {
  entries: IndexMap<String, Value>,
}

impl JoseHeader {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse a header from its JSON byte representation
  pub fn from_json_slice(bytes: &[u8]) -> JoseResult<Self> {
    serde_json::from_slice(bytes).map_err(|e| JoseError::MalformedHeader(e.to_string()))
  }

  /// Serialize the header to JSON bytes, field order preserved
  pub fn to_json_vec(&self) -> JoseResult<Vec<u8>> {
    serde_json::to_vec(&self.entries).map_err(|e| JoseError::JsonError(e.to_string()))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, field: &str) -> bool {
    self.entries.contains_key(field)
  }

  pub fn get(&self, field: &str) -> Option<&Value> {
    self.entries.get(field)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.entries.iter()
  }

  pub fn set_value(&mut self, field: impl Into<String>, value: Value) -> &mut Self {
    self.entries.insert(field.into(), value);
    self
  }

  pub fn set_str(&mut self, field: impl Into<String>, value: &str) -> &mut Self {
    self.set_value(field, Value::String(value.to_string()))
  }

  pub fn set_bool(&mut self, field: impl Into<String>, value: bool) -> &mut Self {
    self.set_value(field, Value::Bool(value))
  }

  pub fn set_u64(&mut self, field: impl Into<String>, value: u64) -> &mut Self {
    self.set_value(field, Value::Number(value.into()))
  }

  /// Store raw bytes as a base64url string field
  pub fn set_bytes(&mut self, field: impl Into<String>, value: &[u8]) -> &mut Self {
    self.set_value(field, Value::String(b64url_encode(value)))
  }

  pub fn remove(&mut self, field: &str) -> Option<Value> {
    self.entries.shift_remove(field)
  }

  /// Copy every entry of `other` into this header, overwriting on collision
  pub fn merge(&mut self, other: &JoseHeader) {
    for (name, value) in other.iter() {
      self.entries.insert(name.clone(), value.clone());
    }
  }

  /* ----- typed accessors, with field-specific failures ----- */

  pub fn str_field(&self, field: &'static str) -> JoseResult<Option<&str>> {
    match self.entries.get(field) {
      None => Ok(None),
      Some(Value::String(s)) => Ok(Some(s.as_str())),
      Some(_) => Err(invalid(field, "expected a string")),
    }
  }

  pub fn require_str(&self, field: &'static str) -> JoseResult<&str> {
    self.str_field(field)?.ok_or(JoseError::MissingHeaderField(field))
  }

  pub fn bool_field(&self, field: &'static str) -> JoseResult<Option<bool>> {
    match self.entries.get(field) {
      None => Ok(None),
      Some(Value::Bool(b)) => Ok(Some(*b)),
      Some(_) => Err(invalid(field, "expected a boolean")),
    }
  }

  pub fn u64_field(&self, field: &'static str) -> JoseResult<Option<u64>> {
    match self.entries.get(field) {
      None => Ok(None),
      Some(Value::Number(n)) => n.as_u64().ok_or_else(|| invalid(field, "expected an unsigned integer")).map(Some),
      Some(_) => Err(invalid(field, "expected an unsigned integer")),
    }
  }

  pub fn require_u64(&self, field: &'static str) -> JoseResult<u64> {
    self.u64_field(field)?.ok_or(JoseError::MissingHeaderField(field))
  }

  /// Decode a base64url string field into bytes
  pub fn bytes_field(&self, field: &'static str) -> JoseResult<Option<Vec<u8>>> {
    match self.str_field(field)? {
      None => Ok(None),
      Some(s) => b64url_decode(s).map(Some).map_err(|_| invalid(field, "invalid base64url")),
    }
  }

  pub fn require_bytes(&self, field: &'static str) -> JoseResult<Vec<u8>> {
    self.bytes_field(field)?.ok_or(JoseError::MissingHeaderField(field))
  }

  /// Decode a base64url string field that must hold exactly `expected` bytes
  pub fn require_bytes_exact(&self, field: &'static str, expected: usize) -> JoseResult<Vec<u8>> {
    let bytes = self.require_bytes(field)?;
    if bytes.len() != expected {
      return Err(invalid(field, format!("expected {} bytes, got {}", expected, bytes.len())));
    }
    Ok(bytes)
  }

  /// Access a nested JSON object field such as `epk`
  pub fn object_field(&self, field: &'static str) -> JoseResult<Option<&serde_json::Map<String, Value>>> {
    match self.entries.get(field) {
      None => Ok(None),
      Some(Value::Object(map)) => Ok(Some(map)),
      Some(_) => Err(invalid(field, "expected a JSON object")),
    }
  }

  /// Read an array-of-strings field such as `crit`
  pub fn str_array_field(&self, field: &'static str) -> JoseResult<Option<Vec<&str>>> {
    match self.entries.get(field) {
      None => Ok(None),
      Some(Value::Array(items)) => items
        .iter()
        .map(|v| v.as_str().ok_or_else(|| invalid(field, "expected an array of strings")))
        .collect::<JoseResult<Vec<_>>>()
        .map(Some),
      Some(_) => Err(invalid(field, "expected an array of strings")),
    }
  }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> JoseError {
  JoseError::InvalidHeaderField {
    field,
    reason: reason.into(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn preserves_insertion_order() {
    let mut header = JoseHeader::new();
    header.set_str("alg", "A128KW").set_str("enc", "A128GCM").set_str("zip", "DEF");
    let json = header.to_json_vec().unwrap();
    assert_eq!(
      String::from_utf8(json).unwrap(),
      r#"{"alg":"A128KW","enc":"A128GCM","zip":"DEF"}"#
    );
  }

  #[test]
  fn json_roundtrip_is_stable() {
    let mut header = JoseHeader::new();
    header.set_str("alg", "dir").set_bool("b64", false).set_u64("p2c", 1000);
    let json = header.to_json_vec().unwrap();
    let reparsed = JoseHeader::from_json_slice(&json).unwrap();
    assert_eq!(reparsed.to_json_vec().unwrap(), json);
  }

  #[test]
  fn typed_getters_are_field_specific() {
    let mut header = JoseHeader::new();
    header.set_u64("p2c", 1000);
    assert!(matches!(
      header.require_str("alg"),
      Err(JoseError::MissingHeaderField("alg"))
    ));
    assert!(matches!(
      header.str_field("p2c"),
      Err(JoseError::InvalidHeaderField { field: "p2c", .. })
    ));
  }

  #[test]
  fn bytes_field_validates_encoding_and_length() {
    let mut header = JoseHeader::new();
    header.set_bytes("iv", &[0u8; 12]);
    assert_eq!(header.require_bytes_exact("iv", 12).unwrap().len(), 12);
    assert!(matches!(
      header.require_bytes_exact("iv", 16),
      Err(JoseError::InvalidHeaderField { field: "iv", .. })
    ));

    header.set_str("tag", "?not-base64url?");
    assert!(matches!(
      header.bytes_field("tag"),
      Err(JoseError::InvalidHeaderField { field: "tag", .. })
    ));
  }

  #[test]
  fn non_object_header_is_rejected() {
    assert!(JoseHeader::from_json_slice(b"[1,2,3]").is_err());
    assert!(JoseHeader::from_json_slice(b"not json").is_err());
  }

  #[test]
  fn merge_overwrites_existing_fields() {
    let mut base = JoseHeader::new();
    base.set_str("alg", "HS256").set_str("typ", "JWT");
    let mut extra = JoseHeader::new();
    extra.set_str("typ", "at+jwt").set_str("kid", "k1");
    base.merge(&extra);
    assert_eq!(base.str_field("typ").unwrap(), Some("at+jwt"));
    assert_eq!(base.str_field("kid").unwrap(), Some("k1"));
    assert_eq!(base.len(), 3);
  }
}
