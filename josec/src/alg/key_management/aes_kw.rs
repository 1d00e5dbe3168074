use aes_kw::{KekAes128, KekAes192, KekAes256};

use crate::error::{JoseError, JoseResult};

/// RFC 3394 wrap: output is the CEK plus one 8-byte integrity block.
/// The CEK must be at least two 8-byte blocks long.
pub(super) fn wrap(kek: &[u8], cek: &[u8], dest: &mut [u8]) -> JoseResult<usize> {
  if cek.len() < 16 || cek.len() % 8 != 0 {
    return Err(JoseError::ProtocolViolation(
      "AES key wrap requires a content key of at least 16 bytes in 8-byte steps".to_string(),
    ));
  }
  let out_len = cek.len() + 8;
  if dest.len() < out_len {
    return Err(JoseError::BufferTooSmall { required: out_len });
  }
  let out = &mut dest[..out_len];
  let wrapped = match kek.len() {
    16 => kek128(kek)?.wrap(cek, out),
    24 => kek192(kek)?.wrap(cek, out),
    32 => kek256(kek)?.wrap(cek, out),
    _ => return Err(bad_kek()),
  };
  wrapped.map_err(|_| JoseError::EncryptionFailure)?;
  Ok(out_len)
}

/// RFC 3394 unwrap; an integrity block mismatch is an encryption failure
pub(super) fn unwrap(kek: &[u8], encrypted_cek: &[u8], dest: &mut [u8]) -> JoseResult<usize> {
  if encrypted_cek.len() < 24 || encrypted_cek.len() % 8 != 0 {
    return Err(JoseError::EncryptionFailure);
  }
  let out_len = encrypted_cek.len() - 8;
  if dest.len() < out_len {
    return Err(JoseError::BufferTooSmall { required: out_len });
  }
  let out = &mut dest[..out_len];
  let unwrapped = match kek.len() {
    16 => kek128(kek)?.unwrap(encrypted_cek, out),
    24 => kek192(kek)?.unwrap(encrypted_cek, out),
    32 => kek256(kek)?.unwrap(encrypted_cek, out),
    _ => return Err(bad_kek()),
  };
  unwrapped.map_err(|_| JoseError::EncryptionFailure)?;
  Ok(out_len)
}

fn kek128(kek: &[u8]) -> JoseResult<KekAes128> {
  KekAes128::try_from(kek).map_err(|_| bad_kek())
}

fn kek192(kek: &[u8]) -> JoseResult<KekAes192> {
  KekAes192::try_from(kek).map_err(|_| bad_kek())
}

fn kek256(kek: &[u8]) -> JoseResult<KekAes256> {
  KekAes256::try_from(kek).map_err(|_| bad_kek())
}

fn bad_kek() -> JoseError {
  JoseError::InvalidKey("AES key wrap requires a 128/192/256-bit key".to_string())
}
