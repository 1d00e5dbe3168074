mod aes_gcm_kw;
mod aes_kw;
mod direct;
mod ecdh_es;
mod pbes2;
mod rsa;

use super::{ec_key, rsa_key, symmetric_key, validate_key_size, ContentEncryptionAlgorithm, KeySizeRange, KeyType};
use crate::{
  buffer::SecretBuffer,
  error::{JoseError, JoseResult},
  header::JoseHeader,
  secret_key::SecretKey,
  trace::*,
};

const RSA_KEK_SIZES: &[KeySizeRange] = &[KeySizeRange::stepped(2048, 16384, 8)];
const EC_KEK_SIZES: &[KeySizeRange] = &[
  KeySizeRange::exact(256),
  KeySizeRange::exact(384),
  KeySizeRange::exact(521),
];
/// CEK sizes JOSE content encryption can ask for, in bytes
const WRAPPABLE_CEK_SIZES: &[KeySizeRange] = &[KeySizeRange::stepped(16, 64, 8)];
const DIR_KEK_SIZES: &[KeySizeRange] = &[KeySizeRange::stepped(128, 512, 8)];
const A128_KEK_SIZES: &[KeySizeRange] = &[KeySizeRange::exact(128)];
const A192_KEK_SIZES: &[KeySizeRange] = &[KeySizeRange::exact(192)];
const A256_KEK_SIZES: &[KeySizeRange] = &[KeySizeRange::exact(256)];
const PBES2_KEK_SIZES: &[KeySizeRange] = &[KeySizeRange::stepped(8, u32::MAX, 8)];

/// Key management (wrapping) algorithms for JWE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyManagementAlgorithm {
  /// Direct use of the shared key as CEK
  Dir,
  /// AES key wrap (RFC 3394)
  A128Kw,
  A192Kw,
  A256Kw,
  /// AES-GCM key wrap, `iv`/`tag` carried in the header
  A128GcmKw,
  A192GcmKw,
  A256GcmKw,
  /// RSAES-PKCS1-v1_5
  Rsa1_5,
  /// RSAES-OAEP (SHA-1 mask by default, per the JOSE registry)
  RsaOaep,
  RsaOaep256,
  RsaOaep384,
  RsaOaep512,
  /// ECDH-ES direct key agreement via Concat KDF
  EcdhEs,
  /// ECDH-ES key agreement followed by AES key wrap
  EcdhEsA128Kw,
  EcdhEsA192Kw,
  EcdhEsA256Kw,
  /// PBKDF2 password-based KEK derivation followed by AES key wrap
  Pbes2Hs256A128Kw,
  Pbes2Hs384A192Kw,
  Pbes2Hs512A256Kw,
}

use KeyManagementAlgorithm::*;

impl KeyManagementAlgorithm {
  pub const ALL: &'static [Self] = &[
    Dir,
    A128Kw,
    A192Kw,
    A256Kw,
    A128GcmKw,
    A192GcmKw,
    A256GcmKw,
    Rsa1_5,
    RsaOaep,
    RsaOaep256,
    RsaOaep384,
    RsaOaep512,
    EcdhEs,
    EcdhEsA128Kw,
    EcdhEsA192Kw,
    EcdhEsA256Kw,
    Pbes2Hs256A128Kw,
    Pbes2Hs384A192Kw,
    Pbes2Hs512A256Kw,
  ];

  /// Registry code of the algorithm
  pub fn code(&self) -> &'static str {
    match self {
      Dir => "dir",
      A128Kw => "A128KW",
      A192Kw => "A192KW",
      A256Kw => "A256KW",
      A128GcmKw => "A128GCMKW",
      A192GcmKw => "A192GCMKW",
      A256GcmKw => "A256GCMKW",
      Rsa1_5 => "RSA1_5",
      RsaOaep => "RSA-OAEP",
      RsaOaep256 => "RSA-OAEP-256",
      RsaOaep384 => "RSA-OAEP-384",
      RsaOaep512 => "RSA-OAEP-512",
      EcdhEs => "ECDH-ES",
      EcdhEsA128Kw => "ECDH-ES+A128KW",
      EcdhEsA192Kw => "ECDH-ES+A192KW",
      EcdhEsA256Kw => "ECDH-ES+A256KW",
      Pbes2Hs256A128Kw => "PBES2-HS256+A128KW",
      Pbes2Hs384A192Kw => "PBES2-HS384+A192KW",
      Pbes2Hs512A256Kw => "PBES2-HS512+A256KW",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    Self::ALL.iter().copied().find(|alg| alg.code() == code)
  }

  pub fn key_type(&self) -> KeyType {
    match self {
      Dir | A128Kw | A192Kw | A256Kw | A128GcmKw | A192GcmKw | A256GcmKw | Pbes2Hs256A128Kw | Pbes2Hs384A192Kw
      | Pbes2Hs512A256Kw => KeyType::Symmetric,
      Rsa1_5 | RsaOaep | RsaOaep256 | RsaOaep384 | RsaOaep512 => KeyType::Rsa,
      EcdhEs | EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => KeyType::EllipticCurve,
    }
  }

  /// Legal key-encryption-key sizes in bits
  pub fn legal_key_sizes(&self) -> &'static [KeySizeRange] {
    match self {
      Dir => DIR_KEK_SIZES,
      A128Kw | A128GcmKw => A128_KEK_SIZES,
      A192Kw | A192GcmKw => A192_KEK_SIZES,
      A256Kw | A256GcmKw => A256_KEK_SIZES,
      Rsa1_5 | RsaOaep | RsaOaep256 | RsaOaep384 | RsaOaep512 => RSA_KEK_SIZES,
      EcdhEs | EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => EC_KEK_SIZES,
      // password bytes, any octet length
      Pbes2Hs256A128Kw | Pbes2Hs384A192Kw | Pbes2Hs512A256Kw => PBES2_KEK_SIZES,
    }
  }

  /// Legal content-encryption-key sizes in bytes for a KEK of the given bit size
  pub fn legal_cek_byte_sizes(&self, kek_size_bits: u32) -> Vec<KeySizeRange> {
    match self {
      Dir => vec![KeySizeRange::exact(kek_size_bits / 8)],
      Rsa1_5 | RsaOaep | RsaOaep256 | RsaOaep384 | RsaOaep512 => {
        let max = (kek_size_bits / 8).saturating_sub(self.rsa_padding_overhead() as u32);
        vec![KeySizeRange::stepped(1, max, 1)]
      }
      _ => WRAPPABLE_CEK_SIZES.to_vec(),
    }
  }

  /// Size in bytes of the encrypted-key segment produced by wrapping
  pub fn encrypted_cek_size_bytes(&self, kek_size_bits: u32, cek_size_bytes: usize) -> usize {
    match self {
      Dir | EcdhEs => 0,
      // RFC 3394 prepends one 8-byte integrity block
      A128Kw | A192Kw | A256Kw | EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw | Pbes2Hs256A128Kw | Pbes2Hs384A192Kw
      | Pbes2Hs512A256Kw => cek_size_bytes + 8,
      // GCM does not expand the ciphertext; iv and tag travel in the header
      A128GcmKw | A192GcmKw | A256GcmKw => cek_size_bytes,
      Rsa1_5 | RsaOaep | RsaOaep256 | RsaOaep384 | RsaOaep512 => (kek_size_bits as usize).div_ceil(8),
    }
  }

  /// Reject a key whose type or size does not fit this algorithm
  pub fn validate_key(&self, key: &SecretKey) -> JoseResult<()> {
    match self.key_type() {
      KeyType::Symmetric => {
        symmetric_key(self.code(), key)?;
      }
      KeyType::Rsa => {
        rsa_key(self.code(), key)?;
      }
      KeyType::EllipticCurve => {
        ec_key(self.code(), key)?;
      }
      _ => unreachable!(),
    }
    validate_key_size(self.code(), self.legal_key_sizes(), key.key_size_bits())
  }

  /// Produce a fresh CEK into `dest_cek`.
  ///
  /// `dir` copies the KEK (the destination must match its size exactly);
  /// `ECDH-ES` derives the CEK and records `epk` in the header; every
  /// wrapping algorithm fills the destination with random bytes.
  pub fn new_key(&self, key: &SecretKey, header: &mut JoseHeader, dest_cek: &mut [u8]) -> JoseResult<()> {
    self.validate_key(key)?;
    match self {
      Dir => direct::new_key(symmetric_key(self.code(), key)?.as_bytes(), dest_cek),
      EcdhEs => {
        let algorithm_id = header.require_str("enc")?.to_string();
        let derived = ecdh_es::derive_for_encrypt(key.asymmetric()?, header, &algorithm_id, dest_cek.len())?;
        dest_cek.copy_from_slice(derived.as_slice());
        Ok(())
      }
      _ => {
        rand::Rng::fill(&mut rand::rng(), dest_cek);
        Ok(())
      }
    }
  }

  /// Wrap an externally supplied CEK into `dest_encrypted_cek`.
  /// Returns the number of bytes written.
  pub fn try_wrap_key(
    &self,
    key: &SecretKey,
    header: &mut JoseHeader,
    cek: &[u8],
    dest_encrypted_cek: &mut [u8],
  ) -> JoseResult<usize> {
    self.validate_key(key)?;
    match self {
      Dir | EcdhEs => Err(JoseError::ProtocolViolation(format!(
        "Algorithm {} cannot wrap an externally supplied content key",
        self.code()
      ))),
      A128Kw | A192Kw | A256Kw => aes_kw::wrap(symmetric_key(self.code(), key)?.as_bytes(), cek, dest_encrypted_cek),
      A128GcmKw | A192GcmKw | A256GcmKw => {
        aes_gcm_kw::wrap(symmetric_key(self.code(), key)?.as_bytes(), header, cek, dest_encrypted_cek)
      }
      Rsa1_5 | RsaOaep | RsaOaep256 | RsaOaep384 | RsaOaep512 => {
        rsa::wrap(*self, key.asymmetric()?, cek, dest_encrypted_cek)
      }
      EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => {
        let kek = ecdh_es::derive_for_encrypt(key.asymmetric()?, header, self.code(), self.derived_kek_size())?;
        aes_kw::wrap(kek.as_slice(), cek, dest_encrypted_cek)
      }
      Pbes2Hs256A128Kw | Pbes2Hs384A192Kw | Pbes2Hs512A256Kw => {
        pbes2::wrap(*self, symmetric_key(self.code(), key)?.as_bytes(), header, cek, dest_encrypted_cek)
      }
    }
  }

  /// Produce a fresh CEK into `dest_cek` and wrap it into
  /// `dest_encrypted_cek` in one step. Returns the encrypted size, which is
  /// zero for the direct algorithms.
  pub fn try_wrap_new_key(
    &self,
    key: &SecretKey,
    header: &mut JoseHeader,
    dest_cek: &mut [u8],
    dest_encrypted_cek: &mut [u8],
  ) -> JoseResult<usize> {
    self.new_key(key, header, dest_cek)?;
    match self {
      Dir | EcdhEs => Ok(0),
      _ => {
        let cek: &[u8] = dest_cek;
        self.try_wrap_key(key, header, cek, dest_encrypted_cek)
      }
    }
  }

  /// Unwrap `encrypted_cek` into `dest_cek`. Returns the number of bytes
  /// written. Header fields required by the algorithm (`iv`, `tag`, `p2s`,
  /// `p2c`, `epk`) are validated before any cryptographic work.
  pub fn try_unwrap_key(
    &self,
    key: &SecretKey,
    header: &JoseHeader,
    encrypted_cek: &[u8],
    dest_cek: &mut [u8],
  ) -> JoseResult<usize> {
    self.validate_key(key)?;
    match self {
      Dir => direct::unwrap(symmetric_key(self.code(), key)?.as_bytes(), encrypted_cek, dest_cek),
      A128Kw | A192Kw | A256Kw => aes_kw::unwrap(symmetric_key(self.code(), key)?.as_bytes(), encrypted_cek, dest_cek),
      A128GcmKw | A192GcmKw | A256GcmKw => {
        aes_gcm_kw::unwrap(symmetric_key(self.code(), key)?.as_bytes(), header, encrypted_cek, dest_cek)
      }
      Rsa1_5 | RsaOaep | RsaOaep256 | RsaOaep384 | RsaOaep512 => {
        rsa::unwrap(*self, key.asymmetric()?, encrypted_cek, dest_cek)
      }
      EcdhEs => {
        if !encrypted_cek.is_empty() {
          return Err(JoseError::EncryptionFailure);
        }
        let algorithm_id = header.require_str("enc")?;
        let derived = ecdh_es::derive_for_decrypt(key.asymmetric()?, header, algorithm_id, dest_cek.len())?;
        dest_cek.copy_from_slice(derived.as_slice());
        Ok(derived.len())
      }
      EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => {
        let kek = ecdh_es::derive_for_decrypt(key.asymmetric()?, header, self.code(), self.derived_kek_size())?;
        aes_kw::unwrap(kek.as_slice(), encrypted_cek, dest_cek)
      }
      Pbes2Hs256A128Kw | Pbes2Hs384A192Kw | Pbes2Hs512A256Kw => {
        pbes2::unwrap(*self, symmetric_key(self.code(), key)?.as_bytes(), header, encrypted_cek, dest_cek)
      }
    }
  }

  /// Generate and wrap a CEK sized for `enc`, leasing exact buffers.
  /// Used by the JWE serializer.
  pub(crate) fn wrap_new_cek(
    &self,
    key: &SecretKey,
    header: &mut JoseHeader,
    enc: ContentEncryptionAlgorithm,
  ) -> JoseResult<(SecretBuffer, Vec<u8>)> {
    let cek_len = match self {
      Dir => {
        let kek = symmetric_key(self.code(), key)?;
        if kek.as_bytes().len() != enc.content_key_size_bytes() {
          return Err(JoseError::InvalidKey(format!(
            "Direct key must be exactly {} bytes for {}",
            enc.content_key_size_bytes(),
            enc.code()
          )));
        }
        kek.as_bytes().len()
      }
      _ => enc.content_key_size_bytes(),
    };
    let mut cek = SecretBuffer::zeroed(cek_len);
    let mut encrypted = vec![0u8; self.encrypted_cek_size_bytes(key.key_size_bits(), cek_len)];
    let written = self.try_wrap_new_key(key, header, cek.as_mut_slice(), &mut encrypted)?;
    encrypted.truncate(written);
    debug!(alg = self.code(), "wrapped fresh content encryption key");
    Ok((cek, encrypted))
  }

  /// Unwrap the CEK of an incoming token, validating sizes for `enc`.
  /// Used by the JWE serializer; any unwrap failure or an empty result is an
  /// encryption failure.
  pub(crate) fn unwrap_cek(
    &self,
    key: &SecretKey,
    header: &JoseHeader,
    encrypted_cek: &[u8],
    enc: ContentEncryptionAlgorithm,
  ) -> JoseResult<SecretBuffer> {
    let expected = enc.content_key_size_bytes();
    let dest_len = match self {
      Dir => symmetric_key(self.code(), key)?.as_bytes().len(),
      _ => expected,
    };
    if self.encrypted_cek_size_bytes(key.key_size_bits(), dest_len) != encrypted_cek.len() {
      return Err(JoseError::EncryptionFailure);
    }
    let mut cek = SecretBuffer::zeroed(dest_len);
    let written = self.try_unwrap_key(key, header, encrypted_cek, cek.as_mut_slice())?;
    if written == 0 || written != expected {
      return Err(JoseError::EncryptionFailure);
    }
    cek.truncate(written);
    Ok(cek)
  }

  /// KEK size derived by the ECDH-ES+AKW variants, in bytes
  fn derived_kek_size(&self) -> usize {
    match self {
      EcdhEsA128Kw => 16,
      EcdhEsA192Kw => 24,
      EcdhEsA256Kw => 32,
      _ => unreachable!("not an ECDH-ES+AKW algorithm"),
    }
  }

  /// Fixed PKCS#1/OAEP padding overhead in bytes
  fn rsa_padding_overhead(&self) -> usize {
    match self {
      Rsa1_5 => 11,
      RsaOaep => 2 * 20 + 2,
      RsaOaep256 => 2 * 32 + 2,
      RsaOaep384 => 2 * 48 + 2,
      RsaOaep512 => 2 * 64 + 2,
      _ => unreachable!("not an RSA algorithm"),
    }
  }
}

impl std::fmt::Display for KeyManagementAlgorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.code())
  }
}
