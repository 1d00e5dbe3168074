use aes::{
  cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit},
  Aes128, Aes192, Aes256,
};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::ContentEncryptionAlgorithm;
use crate::error::{JoseError, JoseResult};

/// Encrypt-then-MAC composite: AES-CBC over the second half of the CEK,
/// HMAC over `aad || iv || ciphertext || al` keyed with the first half,
/// tag truncated to half the hash size.
pub(super) fn encrypt(
  alg: ContentEncryptionAlgorithm,
  cek: &[u8],
  nonce: &[u8],
  plaintext: &[u8],
  aad: &[u8],
  ciphertext: &mut [u8],
  tag: &mut [u8],
) -> JoseResult<()> {
  let (mac_key, enc_key) = cek.split_at(cek.len() / 2);

  let written = match alg {
    ContentEncryptionAlgorithm::A128CbcHs256 => cbc_encrypt::<Aes128>(enc_key, nonce, plaintext, ciphertext)?,
    ContentEncryptionAlgorithm::A192CbcHs384 => cbc_encrypt::<Aes192>(enc_key, nonce, plaintext, ciphertext)?,
    ContentEncryptionAlgorithm::A256CbcHs512 => cbc_encrypt::<Aes256>(enc_key, nonce, plaintext, ciphertext)?,
    _ => unreachable!("not a CBC-HMAC algorithm"),
  };
  debug_assert_eq!(written, ciphertext.len());

  let computed = compute_tag(alg, mac_key, aad, nonce, ciphertext)?;
  let tag_len = alg.authentication_tag_size_bytes();
  tag[..tag_len].copy_from_slice(&computed[..tag_len]);
  Ok(())
}

/// Check the tag first, then decrypt; a padding defect after a valid tag is
/// still reported as the same integrity failure
pub(super) fn decrypt(
  alg: ContentEncryptionAlgorithm,
  cek: &[u8],
  nonce: &[u8],
  ciphertext: &[u8],
  aad: &[u8],
  tag: &[u8],
  plaintext: &mut [u8],
) -> JoseResult<usize> {
  if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
    return Err(JoseError::IntegrityFailure);
  }
  let (mac_key, enc_key) = cek.split_at(cek.len() / 2);

  let computed = compute_tag(alg, mac_key, aad, nonce, ciphertext)?;
  let tag_len = alg.authentication_tag_size_bytes();
  if !bool::from(computed[..tag_len].ct_eq(tag)) {
    return Err(JoseError::IntegrityFailure);
  }

  match alg {
    ContentEncryptionAlgorithm::A128CbcHs256 => cbc_decrypt::<Aes128>(enc_key, nonce, ciphertext, plaintext),
    ContentEncryptionAlgorithm::A192CbcHs384 => cbc_decrypt::<Aes192>(enc_key, nonce, ciphertext, plaintext),
    ContentEncryptionAlgorithm::A256CbcHs512 => cbc_decrypt::<Aes256>(enc_key, nonce, ciphertext, plaintext),
    _ => unreachable!("not a CBC-HMAC algorithm"),
  }
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8], out: &mut [u8]) -> JoseResult<usize>
where
  C: BlockEncryptMut + aes::cipher::BlockCipher,
  cbc::Encryptor<C>: KeyIvInit,
{
  let encryptor =
    cbc::Encryptor::<C>::new_from_slices(key, iv).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
  let written = encryptor
    .encrypt_padded_b2b_mut::<Pkcs7>(plaintext, out)
    .map_err(|_| JoseError::BufferTooSmall {
      required: (plaintext.len() / 16 + 1) * 16,
    })?
    .len();
  Ok(written)
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8], out: &mut [u8]) -> JoseResult<usize>
where
  C: BlockDecryptMut + aes::cipher::BlockCipher,
  cbc::Decryptor<C>: KeyIvInit,
{
  let decryptor =
    cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
  let written = decryptor
    .decrypt_padded_b2b_mut::<Pkcs7>(ciphertext, out)
    .map_err(|_| JoseError::IntegrityFailure)?
    .len();
  Ok(written)
}

/// HMAC over `aad || iv || ciphertext || bitlen(aad)` per RFC 7518 §5.2
fn compute_tag(
  alg: ContentEncryptionAlgorithm,
  mac_key: &[u8],
  aad: &[u8],
  nonce: &[u8],
  ciphertext: &[u8],
) -> JoseResult<Vec<u8>> {
  let al = ((aad.len() as u64) * 8).to_be_bytes();
  macro_rules! tag_with {
    ($hash:ty) => {{
      let mut mac =
        <Hmac<$hash>>::new_from_slice(mac_key).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
      mac.update(aad);
      mac.update(nonce);
      mac.update(ciphertext);
      mac.update(&al);
      mac.finalize().into_bytes().to_vec()
    }};
  }
  Ok(match alg {
    ContentEncryptionAlgorithm::A128CbcHs256 => tag_with!(Sha256),
    ContentEncryptionAlgorithm::A192CbcHs384 => tag_with!(Sha384),
    ContentEncryptionAlgorithm::A256CbcHs512 => tag_with!(Sha512),
    _ => unreachable!("not a CBC-HMAC algorithm"),
  })
}
