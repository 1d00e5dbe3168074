//! Shared fixtures for the unit tests.

use std::sync::OnceLock;

use crate::secret_key::AsymmetricSecretKey;

static RSA_KEY: OnceLock<rsa::RsaPrivateKey> = OnceLock::new();

/// Process-wide 2048-bit RSA key: generation is expensive, re-export is not
pub(crate) fn test_rsa_key() -> AsymmetricSecretKey {
  let key = RSA_KEY.get_or_init(|| rsa::RsaPrivateKey::new(&mut rand_core::OsRng, 2048).expect("RSA key generation"));
  AsymmetricSecretKey::from_rsa(key).expect("PKCS#8 export of a freshly generated key")
}
