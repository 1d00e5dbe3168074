mod alg;
mod buffer;
mod compact;
mod credentials;
mod error;
mod header;
mod registry;
mod secret_key;
mod serializer;
#[cfg(test)]
mod testing;
mod trace;
mod util;

pub mod prelude {
  pub mod algorithms {
    pub use crate::alg::{
      is_legal_size, CompressionAlgorithm, ContentEncryptionAlgorithm, KeyManagementAlgorithm, KeySizeRange, KeyType,
      SignatureAlgorithm,
    };
  }

  pub use crate::{
    buffer::SecretBuffer,
    compact::{CompactJwt, ProtectionType},
    credentials::{
      select_encrypting_credentials, select_signing_credentials, EncryptingCredentials, SigningCredentials,
    },
    error::{JoseError, JoseResult},
    header::JoseHeader,
    registry::{AlgorithmCollection, AlgorithmCollectionBuilder},
    secret_key::{
      AsymmetricKeyKind, AsymmetricPublicKey, AsymmetricSecretKey, EcCurve, EcSecretKey, KeyId, PemKey, SecretKey,
      SecretKeyCollection, SymmetricSecretKey,
    },
    serializer::{CompactSerializer, DecodedToken},
  };
}

/* ----------------------------------------------------------------- */
#[cfg(test)]
mod tests {
  use super::prelude::{algorithms::*, *};

  /// The §8 scenario: a JSON payload through A128KW + A128GCM with a random
  /// 128-bit key round-trips exactly; a different key fails closed.
  #[test]
  fn scenario_a128kw_a128gcm() {
    let algorithms = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&algorithms);

    let mut keys = SecretKeyCollection::new();
    keys.add(SymmetricSecretKey::generate(16).with_key_id("tenant-key"));
    let credentials =
      select_encrypting_credentials(&algorithms, &["A128KW"], &["A128GCM"], &[], &keys).unwrap();

    let payload = br#"{"sub":"alice"}"#;
    let token = serializer.encode_jwe(payload, &credentials, None).unwrap();
    assert_eq!(token.split('.').count(), 5);

    let decrypted = serializer.decode_jwe(&token, &credentials.key).unwrap();
    assert_eq!(decrypted, payload);

    let other_key: SecretKey = SymmetricSecretKey::generate(16).into();
    assert!(matches!(
      serializer.decode_jwe(&token, &other_key),
      Err(JoseError::EncryptionFailure | JoseError::IntegrityFailure)
    ));
  }

  /// Selection, encoding and decoding wired together the way a token
  /// endpoint would drive them
  #[test]
  fn end_to_end_signing_flow() {
    let algorithms = AlgorithmCollection::builder().disable("none").build();
    let serializer = CompactSerializer::new(&algorithms);

    let mut keys = SecretKeyCollection::new();
    keys
      .add(SymmetricSecretKey::generate(64).with_key_id("hmac-key"))
      .add(AsymmetricSecretKey::generate_ec(EcCurve::P256).unwrap().with_key_id("ec-key"));

    // allow-list order decides: ES256 preferred over HS256
    let credentials = select_signing_credentials(&algorithms, &["ES256", "HS256"], &keys).unwrap();
    assert_eq!(credentials.algorithm, SignatureAlgorithm::Es256);
    assert_eq!(credentials.key.key_id().unwrap().0, "ec-key");

    let mut extra = JoseHeader::new();
    extra.set_str("typ", "JWT");
    let payload = br#"{"iss":"https://issuer.example","sub":"alice"}"#;
    let token = serializer.encode_jws(payload, &credentials, Some(&extra)).unwrap();

    let decoded = serializer.decode(&token, &credentials.key).unwrap();
    assert_eq!(decoded.protection_type, ProtectionType::Jws);
    assert_eq!(decoded.payload, payload);
    assert_eq!(decoded.header.str_field("typ").unwrap(), Some("JWT"));
    assert_eq!(decoded.header.str_field("kid").unwrap(), Some("ec-key"));
  }

  /// Compressed encrypted tokens round-trip through the selector as well
  #[test]
  fn end_to_end_encryption_flow_with_compression() {
    let algorithms = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&algorithms);

    let mut keys = SecretKeyCollection::new();
    keys.add(SymmetricSecretKey::generate(32).with_key_id("kek"));

    let credentials = select_encrypting_credentials(
      &algorithms,
      &["A256GCMKW", "A256KW"],
      &["A128CBC-HS256"],
      &["DEF"],
      &keys,
    )
    .unwrap();
    assert_eq!(credentials.key_management, KeyManagementAlgorithm::A256GcmKw);
    assert_eq!(credentials.compression, CompressionAlgorithm::Deflate);

    let payload = br#"{"claims":"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"}"#;
    let token = serializer.encode_jwe(payload, &credentials, None).unwrap();
    let decoded = serializer.decode(&token, &credentials.key).unwrap();
    assert_eq!(decoded.payload, payload);
    assert_eq!(decoded.header.str_field("zip").unwrap(), Some("DEF"));
  }

  /// Size-rule sanity straight from the interface contract
  #[test]
  fn key_size_rules() {
    assert!(is_legal_size(&[KeySizeRange::stepped(8, u32::MAX, 8)], 128));
    assert!(!is_legal_size(&[KeySizeRange::stepped(8, u32::MAX, 8)], 130));
    assert!(is_legal_size(&[KeySizeRange::exact(256)], 256));
    assert!(!is_legal_size(&[KeySizeRange::exact(256)], 255));
  }
}
