use base64::{engine::general_purpose, Engine as _};

/// Encode bytes with the url-safe alphabet, no padding
pub(crate) fn b64url_encode(input: impl AsRef<[u8]>) -> String {
  general_purpose::URL_SAFE_NO_PAD.encode(input)
}

/// Decode a base64url string, no padding accepted
pub(crate) fn b64url_decode(input: impl AsRef<[u8]>) -> Result<Vec<u8>, base64::DecodeError> {
  general_purpose::URL_SAFE_NO_PAD.decode(input)
}
