use rand::Rng;
use zeroize::Zeroize;

use crate::error::{JoseError, JoseResult};

/// Byte buffer for key material and other sensitive scratch data.
///
/// The backing storage is wiped on drop, so every code path that leases one,
/// including early returns and error propagation, releases it zeroed. Contents
/// are never printed through `Debug`.
pub struct SecretBuffer {
  inner: Vec<u8>,
}

impl SecretBuffer {
  /// Lease a zero-filled buffer of `len` bytes
  pub fn zeroed(len: usize) -> Self {
    Self { inner: vec![0u8; len] }
  }

  /// Lease a buffer filled with `len` random bytes
  pub fn random(len: usize) -> Self {
    let mut inner = vec![0u8; len];
    rand::rng().fill(inner.as_mut_slice());
    Self { inner }
  }

  /// Take ownership of existing bytes
  pub fn from_vec(inner: Vec<u8>) -> Self {
    Self { inner }
  }

  /// Copy the given bytes into owned storage
  pub fn from_slice(bytes: &[u8]) -> Self {
    Self { inner: bytes.to_vec() }
  }

  pub fn len(&self) -> usize {
    self.inner.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }

  pub fn as_slice(&self) -> &[u8] {
    &self.inner
  }

  pub fn as_mut_slice(&mut self) -> &mut [u8] {
    &mut self.inner
  }

  /// Shrink to `len` bytes, wiping the tail before it is cut off
  pub fn truncate(&mut self, len: usize) {
    if len < self.inner.len() {
      self.inner[len..].zeroize();
      self.inner.truncate(len);
    }
  }

  /// Double the buffer size, bounded by `max` bytes.
  /// The grown region is zero-filled; existing content is preserved.
  pub fn grow_double(&mut self, max: usize) -> JoseResult<()> {
    let current = self.inner.len();
    if current >= max {
      return Err(JoseError::BufferTooSmall { required: max });
    }
    let next = (current.saturating_mul(2)).clamp(1, max);
    self.inner.resize(next, 0);
    Ok(())
  }

  /// Wipe the contents in place and release the storage.
  /// Safe to call more than once.
  pub fn dispose(&mut self) {
    self.inner.zeroize();
    self.inner = Vec::new();
  }
}

impl std::ops::Deref for SecretBuffer {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

impl std::ops::DerefMut for SecretBuffer {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.inner
  }
}

impl AsRef<[u8]> for SecretBuffer {
  fn as_ref(&self) -> &[u8] {
    &self.inner
  }
}

impl Drop for SecretBuffer {
  fn drop(&mut self) {
    self.inner.zeroize();
  }
}

impl std::fmt::Debug for SecretBuffer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SecretBuffer").field("len", &self.inner.len()).finish_non_exhaustive()
  }
}
