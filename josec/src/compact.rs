use std::sync::OnceLock;

use crate::{
  error::{JoseError, JoseResult},
  header::JoseHeader,
  util::b64url_decode,
};

/// Protection applied to a compact token, decided by its segment count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionType {
  /// Three segments: signed token
  Jws,
  /// Five segments: encrypted token
  Jwe,
}

/// Borrowed view over the dot-separated segments of a compact token.
///
/// The view never outlives the token text it was parsed from, and the header
/// is base64url/JSON-decoded at most once, on first access.
#[derive(Debug)]
pub struct CompactJwt<'a> {
  token: &'a str,
  segments: Vec<&'a str>,
  protection_type: ProtectionType,
  header: OnceLock<JoseHeader>,
}

impl<'a> CompactJwt<'a> {
  /// Split a compact token. Three segments make a JWS, five a JWE; any
  /// other count is malformed.
  pub fn parse(token: &'a str) -> JoseResult<Self> {
    let segments: Vec<&str> = token.split('.').collect();
    let protection_type = match segments.len() {
      3 => ProtectionType::Jws,
      5 => ProtectionType::Jwe,
      count => {
        return Err(JoseError::MalformedToken(format!(
          "expected 3 or 5 segments, found {count}"
        )))
      }
    };
    Ok(Self {
      token,
      segments,
      protection_type,
      header: OnceLock::new(),
    })
  }

  pub fn token(&self) -> &'a str {
    self.token
  }

  pub fn protection_type(&self) -> ProtectionType {
    self.protection_type
  }

  /// Raw base64url segments in wire order
  pub fn segments(&self) -> &[&'a str] {
    &self.segments
  }

  /// Base64url-decode one segment
  pub fn decode_segment(&self, index: usize) -> JoseResult<Vec<u8>> {
    b64url_decode(self.segments[index])
      .map_err(|_| JoseError::MalformedToken(format!("segment {index} is not valid base64url")))
  }

  /// The decoded protected header. Decoding happens on the first call and
  /// the result is cached; later calls are reads.
  pub fn header(&self) -> JoseResult<&JoseHeader> {
    if let Some(header) = self.header.get() {
      return Ok(header);
    }
    let bytes = self.decode_segment(0)?;
    let parsed = JoseHeader::from_json_slice(&bytes)?;
    Ok(self.header.get_or_init(|| parsed))
  }
}

impl<'a> TryFrom<&'a str> for CompactJwt<'a> {
  type Error = JoseError;

  fn try_from(token: &'a str) -> JoseResult<Self> {
    Self::parse(token)
  }
}
