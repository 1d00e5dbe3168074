use rand::Rng;

use crate::{
  buffer::SecretBuffer,
  compact::{CompactJwt, ProtectionType},
  credentials::{EncryptingCredentials, SigningCredentials},
  error::{JoseError, JoseResult},
  header::JoseHeader,
  registry::AlgorithmCollection,
  secret_key::SecretKey,
  trace::*,
  util::b64url_encode,
};

/// Result of [`CompactSerializer::decode`]
#[derive(Debug)]
pub struct DecodedToken {
  pub protection_type: ProtectionType,
  pub header: JoseHeader,
  pub payload: Vec<u8>,
}

/// Builds and consumes compact JWS/JWE tokens against an algorithm registry
/// snapshot. Stateless; one instance can serve concurrent calls.
#[derive(Debug, Clone, Copy)]
pub struct CompactSerializer<'a> {
  algorithms: &'a AlgorithmCollection,
}

impl<'a> CompactSerializer<'a> {
  pub fn new(algorithms: &'a AlgorithmCollection) -> Self {
    Self { algorithms }
  }

  /* ----- JWS ----- */

  /// Sign `payload` into a three-segment compact token.
  ///
  /// The header starts as `alg` (+ `kid` from the key) and then absorbs
  /// `extra_headers`. Declaring `b64: false` there switches to the unencoded
  /// payload convention: the signature covers the raw payload bytes, the
  /// token is emitted with a detached (empty) payload segment and a
  /// `crit: ["b64"]` entry is forced in.
  pub fn encode_jws(
    &self,
    payload: &[u8],
    credentials: &SigningCredentials,
    extra_headers: Option<&JoseHeader>,
  ) -> JoseResult<String> {
    let alg = credentials.algorithm;
    if self.algorithms.signature(alg.code()).is_none() {
      return Err(JoseError::UnsupportedAlgorithm(alg.code().to_string()));
    }

    let mut header = JoseHeader::new();
    header.set_str("alg", alg.code());
    if let Some(kid) = credentials.key.key_id() {
      header.set_str("kid", &kid.0);
    }
    if let Some(extra) = extra_headers {
      header.merge(extra);
    }
    let b64 = header.bool_field("b64")?.unwrap_or(true);
    if !b64 {
      header.set_value("crit", serde_json::json!(["b64"]));
    }

    let header_b64 = b64url_encode(header.to_json_vec()?);
    if b64 {
      let payload_b64 = b64url_encode(payload);
      let signing_input = format!("{header_b64}.{payload_b64}");
      let signature = alg.sign(&credentials.key, signing_input.as_bytes())?;
      Ok(format!("{signing_input}.{}", b64url_encode(signature)))
    } else {
      let mut signing_input = Vec::with_capacity(header_b64.len() + 1 + payload.len());
      signing_input.extend_from_slice(header_b64.as_bytes());
      signing_input.push(b'.');
      signing_input.extend_from_slice(payload);
      let signature = alg.sign(&credentials.key, &signing_input)?;
      Ok(format!("{header_b64}..{}", b64url_encode(signature)))
    }
  }

  /// Verify a compact JWS and return its payload.
  ///
  /// `detached_payload` supplies the signed bytes when the token carries an
  /// empty payload segment (always the case for `b64: false` tokens emitted
  /// here). The signature segment must decode to exactly the algorithm's
  /// signature size before the verifier runs.
  pub fn verify_jws(&self, token: &str, key: &SecretKey, detached_payload: Option<&[u8]>) -> JoseResult<Vec<u8>> {
    let jwt = CompactJwt::parse(token)?;
    if jwt.protection_type() != ProtectionType::Jws {
      return Err(JoseError::MalformedToken("expected a JWS".to_string()));
    }
    let header = jwt.header()?;
    let alg_code = header.require_str("alg")?;
    let alg = self
      .algorithms
      .signature(alg_code)
      .ok_or_else(|| JoseError::UnsupportedAlgorithm(alg_code.to_string()))?;

    let b64 = header.bool_field("b64")?.unwrap_or(true);
    if let Some(critical) = header.str_array_field("crit")? {
      for entry in &critical {
        if *entry != "b64" {
          return Err(JoseError::ProtocolViolation(format!(
            "unsupported critical header field `{entry}`"
          )));
        }
      }
      if !b64 && !critical.contains(&"b64") {
        return Err(JoseError::ProtocolViolation(
          "`b64: false` requires a `crit: [\"b64\"]` entry".to_string(),
        ));
      }
    } else if !b64 {
      return Err(JoseError::ProtocolViolation(
        "`b64: false` requires a `crit: [\"b64\"]` entry".to_string(),
      ));
    }

    let payload_segment = jwt.segments()[1];
    let (payload_part, payload): (Vec<u8>, Vec<u8>) = if b64 {
      match (payload_segment.is_empty(), detached_payload) {
        (false, _) => (payload_segment.as_bytes().to_vec(), jwt.decode_segment(1)?),
        (true, Some(detached)) => (b64url_encode(detached).into_bytes(), detached.to_vec()),
        (true, None) => (Vec::new(), Vec::new()),
      }
    } else {
      match (payload_segment.is_empty(), detached_payload) {
        (false, _) => (payload_segment.as_bytes().to_vec(), payload_segment.as_bytes().to_vec()),
        (true, Some(detached)) => (detached.to_vec(), detached.to_vec()),
        (true, None) => (Vec::new(), Vec::new()),
      }
    };

    let mut signing_input = Vec::with_capacity(jwt.segments()[0].len() + 1 + payload_part.len());
    signing_input.extend_from_slice(jwt.segments()[0].as_bytes());
    signing_input.push(b'.');
    signing_input.extend_from_slice(&payload_part);

    let signature = jwt.decode_segment(2)?;
    if signature.len() != alg.signature_size_bytes(key.key_size_bits()) {
      return Err(JoseError::IntegrityFailure);
    }
    alg.verify(key, &signing_input, &signature)?;
    debug!(alg = alg.code(), "verified JWS");
    Ok(payload)
  }

  /* ----- JWE ----- */

  /// Encrypt `payload` into a five-segment compact token.
  ///
  /// Header construction order matters: `alg`/`enc` (+ `kid`, extras) first,
  /// then key wrapping, which may add `iv`/`tag`/`p2s`/`p2c`/`epk`, then
  /// compression, which may add `zip`. Only after that is the header frozen
  /// into the AAD.
  pub fn encode_jwe(
    &self,
    payload: &[u8],
    credentials: &EncryptingCredentials,
    extra_headers: Option<&JoseHeader>,
  ) -> JoseResult<String> {
    let alg = credentials.key_management;
    let enc = credentials.content_encryption;
    if self.algorithms.key_management(alg.code()).is_none() {
      return Err(JoseError::UnsupportedAlgorithm(alg.code().to_string()));
    }
    if self.algorithms.content_encryption(enc.code()).is_none() {
      return Err(JoseError::UnsupportedAlgorithm(enc.code().to_string()));
    }

    let mut header = JoseHeader::new();
    header.set_str("alg", alg.code());
    header.set_str("enc", enc.code());
    if let Some(kid) = credentials.key.key_id() {
      header.set_str("kid", &kid.0);
    }
    if let Some(extra) = extra_headers {
      header.merge(extra);
    }

    let (cek, encrypted_cek) = alg.wrap_new_cek(&credentials.key, &mut header, enc)?;

    let mut nonce = vec![0u8; enc.nonce_size_bytes()];
    rand::rng().fill(nonce.as_mut_slice());

    let plaintext = credentials.compression.compress(&mut header, payload)?;

    let header_b64 = b64url_encode(header.to_json_vec()?);
    let aad = header_b64.as_bytes();

    let mut ciphertext = vec![0u8; enc.ciphertext_size_bytes(plaintext.len())];
    let mut tag = vec![0u8; enc.authentication_tag_size_bytes()];
    enc.encrypt(cek.as_slice(), &nonce, plaintext.as_slice(), aad, &mut ciphertext, &mut tag)?;

    debug!(alg = alg.code(), enc = enc.code(), "encoded JWE");
    Ok(format!(
      "{header_b64}.{}.{}.{}.{}",
      b64url_encode(&encrypted_cek),
      b64url_encode(&nonce),
      b64url_encode(&ciphertext),
      b64url_encode(&tag)
    ))
  }

  /// Decrypt a compact JWE and return its plaintext.
  ///
  /// The AAD is recomputed from the header segment exactly as transmitted.
  /// A failed or empty key unwrap is an encryption failure; a tag mismatch
  /// is an integrity failure and no partial plaintext escapes.
  pub fn decode_jwe(&self, token: &str, key: &SecretKey) -> JoseResult<Vec<u8>> {
    let jwt = CompactJwt::parse(token)?;
    if jwt.protection_type() != ProtectionType::Jwe {
      return Err(JoseError::MalformedToken("expected a JWE".to_string()));
    }
    let header = jwt.header()?;
    let alg_code = header.require_str("alg")?;
    let enc_code = header.require_str("enc")?;
    let alg = self
      .algorithms
      .key_management(alg_code)
      .ok_or_else(|| JoseError::UnsupportedAlgorithm(alg_code.to_string()))?;
    let enc = self
      .algorithms
      .content_encryption(enc_code)
      .ok_or_else(|| JoseError::UnsupportedAlgorithm(enc_code.to_string()))?;

    let encrypted_cek = jwt.decode_segment(1)?;
    let nonce = jwt.decode_segment(2)?;
    let ciphertext = jwt.decode_segment(3)?;
    let tag = jwt.decode_segment(4)?;

    let cek = alg.unwrap_cek(key, header, &encrypted_cek, enc)?;

    let aad = jwt.segments()[0].as_bytes();
    let mut plaintext = SecretBuffer::zeroed(enc.max_plaintext_size_bytes(ciphertext.len()));
    let written = enc.try_decrypt(cek.as_slice(), &nonce, &ciphertext, aad, &tag, plaintext.as_mut_slice())?;
    let content = &plaintext.as_slice()[..written];

    let payload = match header.str_field("zip")? {
      None => content.to_vec(),
      Some(zip_code) => {
        let zip = self
          .algorithms
          .compression(zip_code)
          .ok_or_else(|| JoseError::UnsupportedAlgorithm(zip_code.to_string()))?;
        let mut inflated = Vec::with_capacity(written * 2);
        zip.decompress(content, &mut inflated)?;
        inflated
      }
    };
    debug!(alg = alg.code(), enc = enc.code(), "decoded JWE");
    Ok(payload)
  }

  /* ----- shared entry point ----- */

  /// Decode either protection type, verifying or decrypting with `key`
  pub fn decode(&self, token: &str, key: &SecretKey) -> JoseResult<DecodedToken> {
    let jwt = CompactJwt::parse(token)?;
    let protection_type = jwt.protection_type();
    let header = jwt.header()?.clone();
    let payload = match protection_type {
      ProtectionType::Jws => self.verify_jws(token, key, None)?,
      ProtectionType::Jwe => self.decode_jwe(token, key)?,
    };
    Ok(DecodedToken {
      protection_type,
      header,
      payload,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    alg::{CompressionAlgorithm, ContentEncryptionAlgorithm, KeyManagementAlgorithm, SignatureAlgorithm},
    secret_key::{AsymmetricSecretKey, EcCurve, SecretKey, SymmetricSecretKey},
  };
  use std::sync::Arc;

  fn signing(key: SecretKey, algorithm: SignatureAlgorithm) -> SigningCredentials {
    SigningCredentials {
      key: Arc::new(key),
      algorithm,
    }
  }

  fn encrypting(
    key: SecretKey,
    key_management: KeyManagementAlgorithm,
    content_encryption: ContentEncryptionAlgorithm,
    compression: CompressionAlgorithm,
  ) -> EncryptingCredentials {
    EncryptingCredentials {
      key: Arc::new(key),
      key_management,
      content_encryption,
      compression,
    }
  }

  /// A key fitting the key-management algorithm, sized for `enc` where the
  /// algorithm requires it
  fn key_for(alg: KeyManagementAlgorithm, enc: ContentEncryptionAlgorithm) -> SecretKey {
    use KeyManagementAlgorithm::*;
    match alg {
      Dir => SymmetricSecretKey::generate(enc.content_key_size_bytes()).into(),
      A128Kw | A128GcmKw => SymmetricSecretKey::generate(16).into(),
      A192Kw | A192GcmKw => SymmetricSecretKey::generate(24).into(),
      A256Kw | A256GcmKw => SymmetricSecretKey::generate(32).into(),
      Rsa1_5 | RsaOaep | RsaOaep256 | RsaOaep384 | RsaOaep512 => crate::testing::test_rsa_key().into(),
      EcdhEs | EcdhEsA128Kw => AsymmetricSecretKey::generate_ec(EcCurve::P256).unwrap().into(),
      EcdhEsA192Kw => AsymmetricSecretKey::generate_ec(EcCurve::P384).unwrap().into(),
      EcdhEsA256Kw => AsymmetricSecretKey::generate_ec(EcCurve::P521).unwrap().into(),
      Pbes2Hs256A128Kw | Pbes2Hs384A192Kw | Pbes2Hs512A256Kw => {
        SymmetricSecretKey::from_password("the rain in spain").into()
      }
    }
  }

  #[test]
  fn jws_roundtrip_all_signature_algorithms() {
    let algorithms = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&algorithms);
    let payload = br#"{"sub":"alice","iat":1700000000}"#;

    let cases: Vec<(SignatureAlgorithm, SecretKey)> = vec![
      (SignatureAlgorithm::None, SymmetricSecretKey::generate(16).into()),
      (SignatureAlgorithm::Hs256, SymmetricSecretKey::generate(32).into()),
      (SignatureAlgorithm::Hs384, SymmetricSecretKey::generate(48).into()),
      (SignatureAlgorithm::Hs512, SymmetricSecretKey::generate(64).into()),
      (SignatureAlgorithm::Rs256, crate::testing::test_rsa_key().into()),
      (SignatureAlgorithm::Ps512, crate::testing::test_rsa_key().into()),
      (
        SignatureAlgorithm::Es256,
        AsymmetricSecretKey::generate_ec(EcCurve::P256).unwrap().into(),
      ),
      (
        SignatureAlgorithm::Es384,
        AsymmetricSecretKey::generate_ec(EcCurve::P384).unwrap().into(),
      ),
      (
        SignatureAlgorithm::Es512,
        AsymmetricSecretKey::generate_ec(EcCurve::P521).unwrap().into(),
      ),
      (SignatureAlgorithm::EdDsa, AsymmetricSecretKey::generate_ed25519().unwrap().into()),
    ];

    for (algorithm, key) in cases {
      let credentials = signing(key, algorithm);

      // standard mode
      let token = serializer.encode_jws(payload, &credentials, None).unwrap();
      let verified = serializer.verify_jws(&token, &credentials.key, None).unwrap();
      assert_eq!(verified, payload);
      // detached verification also accepts the same payload
      let verified = serializer.verify_jws(&token, &credentials.key, Some(payload)).unwrap();
      assert_eq!(verified, payload);

      // unencoded payload mode
      let mut extra = JoseHeader::new();
      extra.set_bool("b64", false);
      let token = serializer.encode_jws(payload, &credentials, Some(&extra)).unwrap();
      let verified = serializer.verify_jws(&token, &credentials.key, Some(payload)).unwrap();
      assert_eq!(verified, payload);

      // a flipped payload byte must not verify
      let mut tampered = payload.to_vec();
      tampered[0] ^= 1;
      if algorithm != SignatureAlgorithm::None {
        assert!(matches!(
          serializer.verify_jws(&token, &credentials.key, Some(&tampered)),
          Err(JoseError::IntegrityFailure)
        ));
      }
    }
  }

  #[test]
  fn jws_tampered_signature_fails() {
    let algorithms = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&algorithms);
    let credentials = signing(SymmetricSecretKey::generate(32).into(), SignatureAlgorithm::Hs256);
    let token = serializer.encode_jws(b"payload", &credentials, None).unwrap();

    // flip one character at the front of the signature segment
    let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
    let flipped = if segments[2].starts_with('A') { "B" } else { "A" };
    segments[2].replace_range(0..1, flipped);
    let tampered = segments.join(".");
    assert!(matches!(
      serializer.verify_jws(&tampered, &credentials.key, None),
      Err(JoseError::IntegrityFailure)
    ));

    // truncating the signature fails before the verifier is invoked
    let (head, _) = token.rsplit_once('.').unwrap();
    let truncated = format!("{head}.AAAA");
    assert!(matches!(
      serializer.verify_jws(&truncated, &credentials.key, None),
      Err(JoseError::IntegrityFailure)
    ));
  }

  #[test]
  fn jws_with_disabled_algorithm_is_rejected() {
    let algorithms = AlgorithmCollection::builder().disable("HS256").build();
    let serializer = CompactSerializer::new(&algorithms);
    let credentials = signing(SymmetricSecretKey::generate(32).into(), SignatureAlgorithm::Hs256);
    assert!(matches!(
      serializer.encode_jws(b"p", &credentials, None),
      Err(JoseError::UnsupportedAlgorithm(_))
    ));
  }

  #[test]
  fn jwe_roundtrip_every_triple() {
    let algorithms = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&algorithms);
    let payload = br#"{"sub":"alice","scope":"openid profile email"}"#;

    let mut extra = JoseHeader::new();
    extra.set_u64("p2c", 1000);

    for alg in KeyManagementAlgorithm::ALL {
      for enc in ContentEncryptionAlgorithm::ALL {
        for zip in [CompressionAlgorithm::Identity, CompressionAlgorithm::Deflate] {
          let credentials = encrypting(key_for(*alg, *enc), *alg, *enc, zip);
          let token = serializer.encode_jwe(payload, &credentials, Some(&extra)).unwrap();
          assert_eq!(token.split('.').count(), 5);
          let decrypted = serializer.decode_jwe(&token, &credentials.key).unwrap();
          assert_eq!(decrypted, payload, "{} / {} / {:?}", alg.code(), enc.code(), zip);
        }
      }
    }
  }

  #[test]
  fn jwe_header_records_algorithm_fields() {
    let algorithms = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&algorithms);
    let key: SecretKey = SymmetricSecretKey::generate(16).with_key_id("kek-1").into();
    let credentials = encrypting(
      key,
      KeyManagementAlgorithm::A128GcmKw,
      ContentEncryptionAlgorithm::A128Gcm,
      CompressionAlgorithm::Deflate,
    );
    let token = serializer.encode_jwe(b"data", &credentials, None).unwrap();

    let decoded = serializer.decode(&token, &credentials.key).unwrap();
    assert_eq!(decoded.protection_type, ProtectionType::Jwe);
    assert_eq!(decoded.header.str_field("alg").unwrap(), Some("A128GCMKW"));
    assert_eq!(decoded.header.str_field("enc").unwrap(), Some("A128GCM"));
    assert_eq!(decoded.header.str_field("zip").unwrap(), Some("DEF"));
    assert_eq!(decoded.header.str_field("kid").unwrap(), Some("kek-1"));
    assert_eq!(decoded.header.require_bytes("iv").unwrap().len(), 12);
    assert_eq!(decoded.header.require_bytes("tag").unwrap().len(), 16);
    assert_eq!(decoded.payload, b"data");
  }

  #[test]
  fn jwe_missing_required_header_fields() {
    let algorithms = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&algorithms);
    let key: SecretKey = SymmetricSecretKey::generate(16).into();

    // a JWE whose header lacks `enc`
    let header_b64 = b64url_encode(br#"{"alg":"A128KW"}"#);
    let token = format!("{header_b64}.AAAA.AAAA.AAAA.AAAA");
    assert!(matches!(
      serializer.decode_jwe(&token, &key),
      Err(JoseError::MissingHeaderField("enc"))
    ));

    let header_b64 = b64url_encode(br#"{"enc":"A128GCM"}"#);
    let token = format!("{header_b64}.AAAA.AAAA.AAAA.AAAA");
    assert!(matches!(
      serializer.decode_jwe(&token, &key),
      Err(JoseError::MissingHeaderField("alg"))
    ));
  }

  #[test]
  fn jwe_tampering_fails_with_integrity_or_encryption_error() {
    let algorithms = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&algorithms);
    let credentials = encrypting(
      SymmetricSecretKey::generate(16).into(),
      KeyManagementAlgorithm::A128Kw,
      ContentEncryptionAlgorithm::A128Gcm,
      CompressionAlgorithm::Identity,
    );
    let token = serializer.encode_jwe(b"secret data", &credentials, None).unwrap();

    // tamper with the ciphertext segment
    let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
    let flipped = if segments[3].starts_with('A') { "B" } else { "A" };
    segments[3].replace_range(0..1, flipped);
    let tampered = segments.join(".");
    assert!(matches!(
      serializer.decode_jwe(&tampered, &credentials.key),
      Err(JoseError::IntegrityFailure)
    ));

    // decrypting with a different key fails during unwrap
    let other: SecretKey = SymmetricSecretKey::generate(16).into();
    assert!(matches!(
      serializer.decode_jwe(&token, &other),
      Err(JoseError::EncryptionFailure)
    ));
  }

  #[test]
  fn jwe_with_disabled_algorithm_is_rejected_on_decode() {
    let enabled = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&enabled);
    let credentials = encrypting(
      SymmetricSecretKey::generate(16).into(),
      KeyManagementAlgorithm::A128Kw,
      ContentEncryptionAlgorithm::A128Gcm,
      CompressionAlgorithm::Identity,
    );
    let token = serializer.encode_jwe(b"data", &credentials, None).unwrap();

    let restricted = AlgorithmCollection::builder().disable("A128KW").build();
    let serializer = CompactSerializer::new(&restricted);
    assert!(matches!(
      serializer.decode_jwe(&token, &credentials.key),
      Err(JoseError::UnsupportedAlgorithm(_))
    ));
  }

  #[test]
  fn decode_dispatches_on_protection_type() {
    let algorithms = AlgorithmCollection::all();
    let serializer = CompactSerializer::new(&algorithms);
    let key: SecretKey = SymmetricSecretKey::generate(32).into();
    let signing_creds = signing(key, SignatureAlgorithm::Hs256);
    let token = serializer.encode_jws(b"signed", &signing_creds, None).unwrap();

    let decoded = serializer.decode(&token, &signing_creds.key).unwrap();
    assert_eq!(decoded.protection_type, ProtectionType::Jws);
    assert_eq!(decoded.payload, b"signed");
    assert_eq!(decoded.header.str_field("alg").unwrap(), Some("HS256"));
  }
}
