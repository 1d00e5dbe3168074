use aes::Aes192;
use aes_gcm::{
  aead::{
    consts::{U12, U16},
    AeadCore, AeadInPlace,
  },
  Aes128Gcm, Aes256Gcm, AesGcm, KeyInit, Nonce, Tag,
};

use crate::error::{JoseError, JoseResult};

type Aes192Gcm = AesGcm<Aes192, U12>;

/// AES-GCM with detached tag over caller-supplied buffers.
/// `ciphertext` must be exactly the plaintext size.
pub(super) fn encrypt(
  cek: &[u8],
  nonce: &[u8],
  plaintext: &[u8],
  aad: &[u8],
  ciphertext: &mut [u8],
  tag: &mut [u8],
) -> JoseResult<()> {
  ciphertext.copy_from_slice(plaintext);
  let computed = match cek.len() {
    16 => seal::<Aes128Gcm>(cek, nonce, aad, ciphertext),
    24 => seal::<Aes192Gcm>(cek, nonce, aad, ciphertext),
    _ => seal::<Aes256Gcm>(cek, nonce, aad, ciphertext),
  }?;
  tag[..computed.len()].copy_from_slice(&computed);
  Ok(())
}

/// Decrypt and verify the tag; the plaintext buffer holds the full
/// ciphertext size and nothing usable is left in it on failure
pub(super) fn decrypt(
  cek: &[u8],
  nonce: &[u8],
  ciphertext: &[u8],
  aad: &[u8],
  tag: &[u8],
  plaintext: &mut [u8],
) -> JoseResult<usize> {
  let buffer = &mut plaintext[..ciphertext.len()];
  buffer.copy_from_slice(ciphertext);
  let opened = match cek.len() {
    16 => open::<Aes128Gcm>(cek, nonce, aad, buffer, tag),
    24 => open::<Aes192Gcm>(cek, nonce, aad, buffer, tag),
    _ => open::<Aes256Gcm>(cek, nonce, aad, buffer, tag),
  };
  if let Err(e) = opened {
    buffer.fill(0);
    return Err(e);
  }
  Ok(ciphertext.len())
}

fn seal<C>(cek: &[u8], nonce: &[u8], aad: &[u8], buffer: &mut [u8]) -> JoseResult<[u8; 16]>
where
  C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
  let cipher = C::new_from_slice(cek).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
  let tag = cipher
    .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, buffer)
    .map_err(|_| JoseError::EncryptionFailure)?;
  Ok(tag.into())
}

fn open<C>(cek: &[u8], nonce: &[u8], aad: &[u8], buffer: &mut [u8], tag: &[u8]) -> JoseResult<()>
where
  C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
  let cipher = C::new_from_slice(cek).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
  cipher
    .decrypt_in_place_detached(Nonce::from_slice(nonce), aad, buffer, Tag::from_slice(tag))
    .map_err(|_| JoseError::IntegrityFailure)
}
