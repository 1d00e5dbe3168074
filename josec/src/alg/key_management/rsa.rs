use rand_core::OsRng;
use rsa::{traits::PublicKeyParts, Oaep, Pkcs1v15Encrypt};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use super::KeyManagementAlgorithm;
use crate::{
  error::{JoseError, JoseResult},
  secret_key::AsymmetricSecretKey,
};

/// RSA key transport: the encrypted key always spans the whole modulus.
/// The CEK must leave room for the padding overhead of the chosen scheme.
pub(super) fn wrap(
  alg: KeyManagementAlgorithm,
  key: &AsymmetricSecretKey,
  cek: &[u8],
  dest: &mut [u8],
) -> JoseResult<usize> {
  let sk = key.to_rsa_private_key()?;
  let pk = sk.to_public_key();
  let modulus_len = pk.size();
  let max_cek = modulus_len.saturating_sub(padding_overhead(alg));
  if cek.is_empty() || cek.len() > max_cek {
    return Err(JoseError::ProtocolViolation(format!(
      "Content key of {} bytes is outside the 1..={} range {} supports",
      cek.len(),
      max_cek,
      alg.code()
    )));
  }
  if dest.len() < modulus_len {
    return Err(JoseError::BufferTooSmall { required: modulus_len });
  }

  let ciphertext = match alg {
    KeyManagementAlgorithm::Rsa1_5 => pk.encrypt(&mut OsRng, Pkcs1v15Encrypt, cek),
    KeyManagementAlgorithm::RsaOaep => pk.encrypt(&mut OsRng, Oaep::new::<Sha1>(), cek),
    KeyManagementAlgorithm::RsaOaep256 => pk.encrypt(&mut OsRng, Oaep::new::<Sha256>(), cek),
    KeyManagementAlgorithm::RsaOaep384 => pk.encrypt(&mut OsRng, Oaep::new::<Sha384>(), cek),
    KeyManagementAlgorithm::RsaOaep512 => pk.encrypt(&mut OsRng, Oaep::new::<Sha512>(), cek),
    _ => unreachable!("not an RSA key management algorithm"),
  }
  .map_err(|_| JoseError::EncryptionFailure)?;

  dest[..ciphertext.len()].copy_from_slice(&ciphertext);
  Ok(ciphertext.len())
}

pub(super) fn unwrap(
  alg: KeyManagementAlgorithm,
  key: &AsymmetricSecretKey,
  encrypted_cek: &[u8],
  dest: &mut [u8],
) -> JoseResult<usize> {
  let sk = key.to_rsa_private_key()?;
  let plaintext = match alg {
    KeyManagementAlgorithm::Rsa1_5 => sk.decrypt(Pkcs1v15Encrypt, encrypted_cek),
    KeyManagementAlgorithm::RsaOaep => sk.decrypt(Oaep::new::<Sha1>(), encrypted_cek),
    KeyManagementAlgorithm::RsaOaep256 => sk.decrypt(Oaep::new::<Sha256>(), encrypted_cek),
    KeyManagementAlgorithm::RsaOaep384 => sk.decrypt(Oaep::new::<Sha384>(), encrypted_cek),
    KeyManagementAlgorithm::RsaOaep512 => sk.decrypt(Oaep::new::<Sha512>(), encrypted_cek),
    _ => unreachable!("not an RSA key management algorithm"),
  }
  .map(Zeroizing::new)
  .map_err(|_| JoseError::EncryptionFailure)?;

  if dest.len() < plaintext.len() {
    return Err(JoseError::BufferTooSmall {
      required: plaintext.len(),
    });
  }
  dest[..plaintext.len()].copy_from_slice(&plaintext);
  Ok(plaintext.len())
}

fn padding_overhead(alg: KeyManagementAlgorithm) -> usize {
  match alg {
    KeyManagementAlgorithm::Rsa1_5 => 11,
    KeyManagementAlgorithm::RsaOaep => 2 * Sha1::output_size() + 2,
    KeyManagementAlgorithm::RsaOaep256 => 2 * Sha256::output_size() + 2,
    KeyManagementAlgorithm::RsaOaep384 => 2 * Sha384::output_size() + 2,
    KeyManagementAlgorithm::RsaOaep512 => 2 * Sha512::output_size() + 2,
    _ => unreachable!("not an RSA key management algorithm"),
  }
}
