mod aes_cbc_hmac;
mod aes_gcm;

use super::KeyType;
use crate::error::{JoseError, JoseResult};

/// Authenticated content encryption algorithms for JWE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncryptionAlgorithm {
  /// AES-CBC with an HMAC-SHA2 tag, encrypt-then-MAC
  A128CbcHs256,
  A192CbcHs384,
  A256CbcHs512,
  /// AES-GCM
  A128Gcm,
  A192Gcm,
  A256Gcm,
}

use ContentEncryptionAlgorithm::*;

impl ContentEncryptionAlgorithm {
  pub const ALL: &'static [Self] = &[A128CbcHs256, A192CbcHs384, A256CbcHs512, A128Gcm, A192Gcm, A256Gcm];

  /// Registry code of the algorithm
  pub fn code(&self) -> &'static str {
    match self {
      A128CbcHs256 => "A128CBC-HS256",
      A192CbcHs384 => "A192CBC-HS384",
      A256CbcHs512 => "A256CBC-HS512",
      A128Gcm => "A128GCM",
      A192Gcm => "A192GCM",
      A256Gcm => "A256GCM",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    Self::ALL.iter().copied().find(|alg| alg.code() == code)
  }

  pub fn key_type(&self) -> KeyType {
    KeyType::Symmetric
  }

  /// Content encryption key size in bytes.
  /// The CBC-HMAC composites take a double-length key: MAC half then
  /// encryption half.
  pub fn content_key_size_bytes(&self) -> usize {
    match self {
      A128CbcHs256 => 32,
      A192CbcHs384 => 48,
      A256CbcHs512 => 64,
      A128Gcm => 16,
      A192Gcm => 24,
      A256Gcm => 32,
    }
  }

  pub fn nonce_size_bytes(&self) -> usize {
    match self {
      A128CbcHs256 | A192CbcHs384 | A256CbcHs512 => 16,
      A128Gcm | A192Gcm | A256Gcm => 12,
    }
  }

  pub fn authentication_tag_size_bytes(&self) -> usize {
    match self {
      A128CbcHs256 => 16,
      A192CbcHs384 => 24,
      A256CbcHs512 => 32,
      A128Gcm | A192Gcm | A256Gcm => 16,
    }
  }

  /// Exact ciphertext size for a plaintext of `plaintext_len` bytes
  pub fn ciphertext_size_bytes(&self, plaintext_len: usize) -> usize {
    match self {
      // PKCS#7 always pads with at least one byte
      A128CbcHs256 | A192CbcHs384 | A256CbcHs512 => (plaintext_len / 16 + 1) * 16,
      A128Gcm | A192Gcm | A256Gcm => plaintext_len,
    }
  }

  /// Upper bound on the plaintext recovered from `ciphertext_len` bytes.
  /// CBC unpadding strips at least one byte, but block-to-buffer decryption
  /// still needs the full ciphertext length of destination space.
  pub fn max_plaintext_size_bytes(&self, ciphertext_len: usize) -> usize {
    ciphertext_len
  }

  /// Encrypt into the caller-supplied ciphertext and tag buffers
  pub fn encrypt(
    &self,
    cek: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
    ciphertext: &mut [u8],
    tag: &mut [u8],
  ) -> JoseResult<()> {
    self.check_cek(cek)?;
    if nonce.len() != self.nonce_size_bytes() {
      return Err(JoseError::ProtocolViolation(format!(
        "{} requires a {}-byte nonce",
        self.code(),
        self.nonce_size_bytes()
      )));
    }
    let ct_len = self.ciphertext_size_bytes(plaintext.len());
    if ciphertext.len() < ct_len {
      return Err(JoseError::BufferTooSmall { required: ct_len });
    }
    if tag.len() < self.authentication_tag_size_bytes() {
      return Err(JoseError::BufferTooSmall {
        required: self.authentication_tag_size_bytes(),
      });
    }
    match self {
      A128CbcHs256 | A192CbcHs384 | A256CbcHs512 => {
        aes_cbc_hmac::encrypt(*self, cek, nonce, plaintext, aad, &mut ciphertext[..ct_len], tag)
      }
      A128Gcm | A192Gcm | A256Gcm => aes_gcm::encrypt(cek, nonce, plaintext, aad, &mut ciphertext[..ct_len], tag),
    }
  }

  /// Authenticate and decrypt into the caller-supplied plaintext buffer.
  /// Returns the plaintext size; nothing is written on a failed tag check.
  pub fn try_decrypt(
    &self,
    cek: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
    tag: &[u8],
    plaintext: &mut [u8],
  ) -> JoseResult<usize> {
    self.check_cek(cek)?;
    if nonce.len() != self.nonce_size_bytes() || tag.len() != self.authentication_tag_size_bytes() {
      return Err(JoseError::IntegrityFailure);
    }
    if plaintext.len() < self.max_plaintext_size_bytes(ciphertext.len()) {
      return Err(JoseError::BufferTooSmall {
        required: self.max_plaintext_size_bytes(ciphertext.len()),
      });
    }
    match self {
      A128CbcHs256 | A192CbcHs384 | A256CbcHs512 => {
        aes_cbc_hmac::decrypt(*self, cek, nonce, ciphertext, aad, tag, plaintext)
      }
      A128Gcm | A192Gcm | A256Gcm => aes_gcm::decrypt(cek, nonce, ciphertext, aad, tag, plaintext),
    }
  }

  fn check_cek(&self, cek: &[u8]) -> JoseResult<()> {
    if cek.len() != self.content_key_size_bytes() {
      return Err(JoseError::InvalidKey(format!(
        "{} requires a {}-byte content encryption key",
        self.code(),
        self.content_key_size_bytes()
      )));
    }
    Ok(())
  }
}

impl std::fmt::Display for ContentEncryptionAlgorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.code())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roundtrip(alg: ContentEncryptionAlgorithm) {
    let cek = vec![0x42u8; alg.content_key_size_bytes()];
    let nonce = vec![0x24u8; alg.nonce_size_bytes()];
    let plaintext = b"Live long and prosper.";
    let aad = b"eyJhbGciOiJBMTI4S1ciLCJlbmMiOiJBMTI4R0NNIn0";

    let mut ciphertext = vec![0u8; alg.ciphertext_size_bytes(plaintext.len())];
    let mut tag = vec![0u8; alg.authentication_tag_size_bytes()];
    alg.encrypt(&cek, &nonce, plaintext, aad, &mut ciphertext, &mut tag).unwrap();
    assert_ne!(&ciphertext[..plaintext.len().min(ciphertext.len())], plaintext.as_slice());

    let mut recovered = vec![0u8; alg.max_plaintext_size_bytes(ciphertext.len())];
    let n = alg.try_decrypt(&cek, &nonce, &ciphertext, aad, &tag, &mut recovered).unwrap();
    assert_eq!(&recovered[..n], plaintext.as_slice());
  }

  #[test]
  fn all_algorithms_roundtrip() {
    for alg in ContentEncryptionAlgorithm::ALL {
      roundtrip(*alg);
    }
  }

  #[test]
  fn tampering_is_detected_everywhere() {
    for alg in ContentEncryptionAlgorithm::ALL {
      let cek = vec![1u8; alg.content_key_size_bytes()];
      let nonce = vec![2u8; alg.nonce_size_bytes()];
      let aad = b"protected";
      let mut ciphertext = vec![0u8; alg.ciphertext_size_bytes(5)];
      let mut tag = vec![0u8; alg.authentication_tag_size_bytes()];
      alg.encrypt(&cek, &nonce, b"hello", aad, &mut ciphertext, &mut tag).unwrap();

      let mut out = vec![0u8; alg.max_plaintext_size_bytes(ciphertext.len())];

      let mut bad_ct = ciphertext.clone();
      bad_ct[0] ^= 1;
      assert!(matches!(
        alg.try_decrypt(&cek, &nonce, &bad_ct, aad, &tag, &mut out),
        Err(JoseError::IntegrityFailure)
      ));

      let mut bad_tag = tag.clone();
      bad_tag[0] ^= 1;
      assert!(matches!(
        alg.try_decrypt(&cek, &nonce, &ciphertext, aad, &bad_tag, &mut out),
        Err(JoseError::IntegrityFailure)
      ));

      assert!(matches!(
        alg.try_decrypt(&cek, &nonce, &ciphertext, b"other aad", &tag, &mut out),
        Err(JoseError::IntegrityFailure)
      ));
    }
  }

  #[test]
  fn cek_size_is_enforced() {
    let alg = A128Gcm;
    let mut ct = [0u8; 5];
    let mut tag = [0u8; 16];
    assert!(matches!(
      alg.encrypt(&[0u8; 17], &[0u8; 12], b"hello", b"", &mut ct, &mut tag),
      Err(JoseError::InvalidKey(_))
    ));
  }

  #[test]
  fn cbc_ciphertext_is_block_padded() {
    assert_eq!(A128CbcHs256.ciphertext_size_bytes(0), 16);
    assert_eq!(A128CbcHs256.ciphertext_size_bytes(15), 16);
    assert_eq!(A128CbcHs256.ciphertext_size_bytes(16), 32);
    assert_eq!(A128Gcm.ciphertext_size_bytes(16), 16);
  }
}
