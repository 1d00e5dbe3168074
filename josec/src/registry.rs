use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
  alg::{CompressionAlgorithm, ContentEncryptionAlgorithm, KeyManagementAlgorithm, SignatureAlgorithm},
  trace::*,
};

/// Immutable snapshot of the enabled algorithms, indexed per capability.
///
/// Built once from the full candidate set minus any disabled codes and never
/// mutated afterwards, so it is safe to share across threads without
/// synchronization. Refreshing (for example after toggling disabled codes)
/// means building a new snapshot and swapping the reference.
#[derive(Debug, Clone)]
pub struct AlgorithmCollection {
  signature: FxHashMap<&'static str, SignatureAlgorithm>,
  key_management: FxHashMap<&'static str, KeyManagementAlgorithm>,
  content_encryption: FxHashMap<&'static str, ContentEncryptionAlgorithm>,
  compression: FxHashMap<&'static str, CompressionAlgorithm>,
}

impl AlgorithmCollection {
  /// Snapshot with every supported algorithm enabled
  pub fn all() -> Self {
    Self::builder().build()
  }

  pub fn builder() -> AlgorithmCollectionBuilder {
    AlgorithmCollectionBuilder::default()
  }

  /// Look up a signature algorithm by code. A code registered under another
  /// capability is indistinguishable from an unknown one.
  pub fn signature(&self, code: &str) -> Option<SignatureAlgorithm> {
    self.signature.get(code).copied()
  }

  pub fn key_management(&self, code: &str) -> Option<KeyManagementAlgorithm> {
    self.key_management.get(code).copied()
  }

  pub fn content_encryption(&self, code: &str) -> Option<ContentEncryptionAlgorithm> {
    self.content_encryption.get(code).copied()
  }

  pub fn compression(&self, code: &str) -> Option<CompressionAlgorithm> {
    self.compression.get(code).copied()
  }

  /// True when the code is enabled under any capability
  pub fn is_enabled(&self, code: &str) -> bool {
    self.signature.contains_key(code)
      || self.key_management.contains_key(code)
      || self.content_encryption.contains_key(code)
      || self.compression.contains_key(code)
  }

  pub fn len(&self) -> usize {
    self.signature.len() + self.key_management.len() + self.content_encryption.len() + self.compression.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Builder applying disabled-code filters once, at construction
#[derive(Debug, Default)]
pub struct AlgorithmCollectionBuilder {
  disabled: FxHashSet<String>,
}

impl AlgorithmCollectionBuilder {
  /// Exclude one algorithm code from the snapshot
  pub fn disable(mut self, code: impl Into<String>) -> Self {
    self.disabled.insert(code.into());
    self
  }

  /// Exclude several algorithm codes from the snapshot
  pub fn disable_all<I, S>(mut self, codes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.disabled.extend(codes.into_iter().map(Into::into));
    self
  }

  pub fn build(self) -> AlgorithmCollection {
    let enabled = |code: &str| !self.disabled.contains(code);

    let collection = AlgorithmCollection {
      signature: SignatureAlgorithm::ALL
        .iter()
        .filter(|alg| enabled(alg.code()))
        .map(|alg| (alg.code(), *alg))
        .collect(),
      key_management: KeyManagementAlgorithm::ALL
        .iter()
        .filter(|alg| enabled(alg.code()))
        .map(|alg| (alg.code(), *alg))
        .collect(),
      content_encryption: ContentEncryptionAlgorithm::ALL
        .iter()
        .filter(|alg| enabled(alg.code()))
        .map(|alg| (alg.code(), *alg))
        .collect(),
      compression: CompressionAlgorithm::ALL
        .iter()
        .filter_map(|alg| alg.code().map(|code| (code, *alg)))
        .filter(|(code, _)| enabled(code))
        .collect(),
    };
    debug!(algorithms = collection.len(), "built algorithm registry snapshot");
    collection
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn full_snapshot_resolves_known_codes() {
    let algorithms = AlgorithmCollection::all();
    assert_eq!(algorithms.signature("HS256"), Some(SignatureAlgorithm::Hs256));
    assert_eq!(algorithms.key_management("A128KW"), Some(KeyManagementAlgorithm::A128Kw));
    assert_eq!(
      algorithms.content_encryption("A256GCM"),
      Some(ContentEncryptionAlgorithm::A256Gcm)
    );
    assert_eq!(algorithms.compression("DEF"), Some(CompressionAlgorithm::Deflate));
  }

  #[test]
  fn disabled_codes_are_absent() {
    let algorithms = AlgorithmCollection::builder().disable("RSA1_5").disable_all(["none", "HS256"]).build();
    assert!(algorithms.key_management("RSA1_5").is_none());
    assert!(algorithms.signature("none").is_none());
    assert!(algorithms.signature("HS256").is_none());
    assert!(algorithms.signature("HS384").is_some());
    assert!(!algorithms.is_enabled("RSA1_5"));
  }

  #[test]
  fn wrong_capability_is_not_found() {
    let algorithms = AlgorithmCollection::all();
    // HS256 exists, but not as a key management algorithm
    assert!(algorithms.key_management("HS256").is_none());
    assert!(algorithms.signature("A128KW").is_none());
    assert!(algorithms.content_encryption("DEF").is_none());
  }
}
