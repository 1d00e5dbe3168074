use aes::Aes192;
use aes_gcm::{
  aead::{
    consts::{U12, U16},
    AeadCore, AeadInPlace,
  },
  Aes128Gcm, Aes256Gcm, AesGcm, KeyInit, Nonce, Tag,
};
use rand::Rng;

use crate::{
  error::{JoseError, JoseResult},
  header::JoseHeader,
};

type Aes192Gcm = AesGcm<Aes192, U12>;

/// 96-bit initialization vector, carried base64url in the `iv` header field
const IV_SIZE: usize = 12;
/// 128-bit authentication tag, carried base64url in the `tag` header field
const TAG_SIZE: usize = 16;

/// GCM wrap: the encrypted key keeps the CEK size; `iv` and `tag` are
/// written into the header
pub(super) fn wrap(kek: &[u8], header: &mut JoseHeader, cek: &[u8], dest: &mut [u8]) -> JoseResult<usize> {
  if dest.len() < cek.len() {
    return Err(JoseError::BufferTooSmall { required: cek.len() });
  }
  let mut iv = [0u8; IV_SIZE];
  rand::rng().fill(&mut iv[..]);

  let buffer = &mut dest[..cek.len()];
  buffer.copy_from_slice(cek);
  let tag = match kek.len() {
    16 => seal::<Aes128Gcm>(kek, &iv, buffer),
    24 => seal::<Aes192Gcm>(kek, &iv, buffer),
    32 => seal::<Aes256Gcm>(kek, &iv, buffer),
    _ => Err(JoseError::InvalidKey(
      "AES-GCM key wrap requires a 128/192/256-bit key".to_string(),
    )),
  }?;

  header.set_bytes("iv", &iv);
  header.set_bytes("tag", &tag);
  Ok(cek.len())
}

/// GCM unwrap. Both `iv` and `tag` must be present, correctly sized and
/// valid base64url before any decryption is attempted; each failure names
/// the offending field.
pub(super) fn unwrap(kek: &[u8], header: &JoseHeader, encrypted_cek: &[u8], dest: &mut [u8]) -> JoseResult<usize> {
  let iv = header.require_bytes_exact("iv", IV_SIZE)?;
  let tag = header.require_bytes_exact("tag", TAG_SIZE)?;
  if dest.len() < encrypted_cek.len() {
    return Err(JoseError::BufferTooSmall {
      required: encrypted_cek.len(),
    });
  }

  let buffer = &mut dest[..encrypted_cek.len()];
  buffer.copy_from_slice(encrypted_cek);
  match kek.len() {
    16 => open::<Aes128Gcm>(kek, &iv, buffer, &tag),
    24 => open::<Aes192Gcm>(kek, &iv, buffer, &tag),
    32 => open::<Aes256Gcm>(kek, &iv, buffer, &tag),
    _ => Err(JoseError::InvalidKey(
      "AES-GCM key wrap requires a 128/192/256-bit key".to_string(),
    )),
  }?;
  Ok(encrypted_cek.len())
}

fn seal<C>(kek: &[u8], iv: &[u8], buffer: &mut [u8]) -> JoseResult<[u8; TAG_SIZE]>
where
  C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
  let cipher = C::new_from_slice(kek).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
  let tag = cipher
    .encrypt_in_place_detached(Nonce::from_slice(iv), b"", buffer)
    .map_err(|_| JoseError::EncryptionFailure)?;
  Ok(tag.into())
}

fn open<C>(kek: &[u8], iv: &[u8], buffer: &mut [u8], tag: &[u8]) -> JoseResult<()>
where
  C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
  let cipher = C::new_from_slice(kek).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
  cipher
    .decrypt_in_place_detached(Nonce::from_slice(iv), b"", buffer, Tag::from_slice(tag))
    .map_err(|_| JoseError::EncryptionFailure)
}
