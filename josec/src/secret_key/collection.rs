use std::sync::Arc;

use super::SecretKey;

/// Ordered collection of secret keys, as handed to the credential selector.
///
/// Insertion order is preserved and meaningful: the selector walks keys in
/// this order when several satisfy an algorithm's constraints.
#[derive(Debug, Default)]
pub struct SecretKeyCollection {
  keys: Vec<Arc<SecretKey>>,
}

impl SecretKeyCollection {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_keys(keys: impl IntoIterator<Item = SecretKey>) -> Self {
    Self {
      keys: keys.into_iter().map(Arc::new).collect(),
    }
  }

  pub fn add(&mut self, key: impl Into<SecretKey>) -> &mut Self {
    self.keys.push(Arc::new(key.into()));
    self
  }

  pub fn len(&self) -> usize {
    self.keys.len()
  }

  pub fn is_empty(&self) -> bool {
    self.keys.is_empty()
  }

  /// Find a key by its `kid`. Keys without an identifier never match.
  pub fn try_get_by_key_id(&self, key_id: &str) -> Option<Arc<SecretKey>> {
    self.keys.iter().find(|k| k.key_id().is_some_and(|id| id.0 == key_id)).cloned()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<SecretKey>> {
    self.keys.iter()
  }

  /// Drop every key, wiping material that is not shared elsewhere.
  /// Shared handles are wiped when their last reference is released.
  pub fn dispose_all(&mut self) {
    for key in self.keys.drain(..) {
      if let Ok(mut owned) = Arc::try_unwrap(key) {
        owned.dispose();
      }
    }
  }
}
