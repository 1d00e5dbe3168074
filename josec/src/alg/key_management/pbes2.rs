use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::{Sha256, Sha384, Sha512};

use super::{aes_kw, KeyManagementAlgorithm};
use crate::{
  buffer::SecretBuffer,
  error::{JoseError, JoseResult},
  header::JoseHeader,
};

/// Random salt-input bytes appended after `alg || 0x00`
const SALT_INPUT_SIZE: usize = 16;
/// RFC 7518 floor for the PBKDF2 iteration count
const MIN_ITERATIONS: u64 = 1000;
/// Default when the caller does not pin `p2c`
const DEFAULT_ITERATIONS: u64 = 8192;

/// Derive a KEK from the password and wrap the CEK with AES key wrap.
/// The iteration count is bounds-checked before any key derivation runs;
/// `p2s` and `p2c` are recorded in the header.
pub(super) fn wrap(
  alg: KeyManagementAlgorithm,
  password: &[u8],
  header: &mut JoseHeader,
  cek: &[u8],
  dest: &mut [u8],
) -> JoseResult<usize> {
  let iterations = match header.u64_field("p2c")? {
    Some(requested) => validate_iterations(alg, requested)?,
    None => DEFAULT_ITERATIONS,
  };

  let code = alg.code().as_bytes();
  let mut salt = SecretBuffer::zeroed(code.len() + 1 + SALT_INPUT_SIZE);
  salt[..code.len()].copy_from_slice(code);
  rand::rng().fill(&mut salt[code.len() + 1..]);

  let kek = derive_kek(alg, password, salt.as_slice(), iterations);
  header.set_bytes("p2s", salt.as_slice());
  header.set_u64("p2c", iterations);
  aes_kw::wrap(kek.as_slice(), cek, dest)
}

/// Re-derive the KEK from `p2s`/`p2c` and unwrap the CEK.
/// Both fields are required and `p2c` must sit inside the legal bounds.
pub(super) fn unwrap(
  alg: KeyManagementAlgorithm,
  password: &[u8],
  header: &JoseHeader,
  encrypted_cek: &[u8],
  dest: &mut [u8],
) -> JoseResult<usize> {
  let iterations = validate_iterations(alg, header.require_u64("p2c")?)?;
  let salt = header.require_bytes("p2s")?;
  if salt.len() <= alg.code().len() + 1 {
    return Err(JoseError::InvalidHeaderField {
      field: "p2s",
      reason: "salt is shorter than the algorithm prefix".to_string(),
    });
  }
  let kek = derive_kek(alg, password, &salt, iterations);
  aes_kw::unwrap(kek.as_slice(), encrypted_cek, dest)
}

fn validate_iterations(alg: KeyManagementAlgorithm, p2c: u64) -> JoseResult<u64> {
  if p2c < MIN_ITERATIONS {
    return Err(JoseError::ProtocolViolation(format!(
      "p2c must be at least {MIN_ITERATIONS}"
    )));
  }
  let max = max_iterations(alg);
  if p2c > max {
    return Err(JoseError::ProtocolViolation(format!(
      "p2c must be at most {max} for {}",
      alg.code()
    )));
  }
  Ok(p2c)
}

fn max_iterations(alg: KeyManagementAlgorithm) -> u64 {
  match alg {
    KeyManagementAlgorithm::Pbes2Hs256A128Kw => 310_000,
    KeyManagementAlgorithm::Pbes2Hs384A192Kw => 250_000,
    KeyManagementAlgorithm::Pbes2Hs512A256Kw => 120_000,
    _ => unreachable!("not a PBES2 algorithm"),
  }
}

fn derive_kek(alg: KeyManagementAlgorithm, password: &[u8], salt: &[u8], iterations: u64) -> SecretBuffer {
  match alg {
    KeyManagementAlgorithm::Pbes2Hs256A128Kw => {
      let mut kek = SecretBuffer::zeroed(16);
      pbkdf2_hmac::<Sha256>(password, salt, iterations as u32, kek.as_mut_slice());
      kek
    }
    KeyManagementAlgorithm::Pbes2Hs384A192Kw => {
      let mut kek = SecretBuffer::zeroed(24);
      pbkdf2_hmac::<Sha384>(password, salt, iterations as u32, kek.as_mut_slice());
      kek
    }
    KeyManagementAlgorithm::Pbes2Hs512A256Kw => {
      let mut kek = SecretBuffer::zeroed(32);
      pbkdf2_hmac::<Sha512>(password, salt, iterations as u32, kek.as_mut_slice());
      kek
    }
    _ => unreachable!("not a PBES2 algorithm"),
  }
}
