use crate::error::{JoseError, JoseResult};

/// Copy the KEK into the destination: with `dir` the shared key *is* the CEK.
/// The destination must match the key size exactly.
pub(super) fn new_key(kek: &[u8], dest_cek: &mut [u8]) -> JoseResult<()> {
  if dest_cek.len() != kek.len() {
    return Err(JoseError::BufferTooSmall { required: kek.len() });
  }
  dest_cek.copy_from_slice(kek);
  Ok(())
}

/// `dir` tokens carry an empty encrypted-key segment; anything else is a
/// token that was not produced for this algorithm
pub(super) fn unwrap(kek: &[u8], encrypted_cek: &[u8], dest_cek: &mut [u8]) -> JoseResult<usize> {
  if !encrypted_cek.is_empty() {
    return Err(JoseError::EncryptionFailure);
  }
  if dest_cek.len() < kek.len() {
    return Err(JoseError::BufferTooSmall { required: kek.len() });
  }
  dest_cek[..kek.len()].copy_from_slice(kek);
  Ok(kek.len())
}
