use ecdsa::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use rand_core::OsRng;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::{
  buffer::SecretBuffer,
  error::{JoseError, JoseResult},
  header::JoseHeader,
  secret_key::{AsymmetricSecretKey, EcCurve, EcSecretKey},
  util::{b64url_decode, b64url_encode},
};

/// Derive key material on the encrypt side: generate an ephemeral key on the
/// static key's curve, run ECDH against the static public key and put the
/// ephemeral public key into the `epk` header field.
///
/// `algorithm_id` keys the Concat KDF: the `enc` code for direct ECDH-ES,
/// the `alg` code for the +AKW variants.
pub(super) fn derive_for_encrypt(
  key: &AsymmetricSecretKey,
  header: &mut JoseHeader,
  algorithm_id: &str,
  key_data_len: usize,
) -> JoseResult<SecretBuffer> {
  let (apu, apv) = party_info(header)?;
  let (shared, epk) = match key.to_ec_secret()? {
    EcSecretKey::P256(sk) => {
      let ephemeral = p256::ecdh::EphemeralSecret::random(&mut OsRng);
      let point = ephemeral.public_key().to_encoded_point(false);
      let shared = ephemeral.diffie_hellman(&sk.public_key());
      (
        SecretBuffer::from_slice(shared.raw_secret_bytes().as_slice()),
        epk_json(EcCurve::P256, point.x().unwrap(), point.y().unwrap()),
      )
    }
    EcSecretKey::P384(sk) => {
      let ephemeral = p384::ecdh::EphemeralSecret::random(&mut OsRng);
      let point = ephemeral.public_key().to_encoded_point(false);
      let shared = ephemeral.diffie_hellman(&sk.public_key());
      (
        SecretBuffer::from_slice(shared.raw_secret_bytes().as_slice()),
        epk_json(EcCurve::P384, point.x().unwrap(), point.y().unwrap()),
      )
    }
    EcSecretKey::P521(sk) => {
      let ephemeral = p521::ecdh::EphemeralSecret::random(&mut OsRng);
      let point = ephemeral.public_key().to_encoded_point(false);
      let shared = ephemeral.diffie_hellman(&sk.public_key());
      (
        SecretBuffer::from_slice(shared.raw_secret_bytes().as_slice()),
        epk_json(EcCurve::P521, point.x().unwrap(), point.y().unwrap()),
      )
    }
  };
  header.set_value("epk", epk);
  Ok(concat_kdf(&shared, algorithm_id, &apu, &apv, key_data_len))
}

/// Derive key material on the decrypt side from the static private key and
/// the `epk` header field, which must carry a point on the same curve.
pub(super) fn derive_for_decrypt(
  key: &AsymmetricSecretKey,
  header: &JoseHeader,
  algorithm_id: &str,
  key_data_len: usize,
) -> JoseResult<SecretBuffer> {
  let (apu, apv) = party_info(header)?;
  let epk = header.object_field("epk")?.ok_or(JoseError::MissingHeaderField("epk"))?;
  let crv = epk
    .get("crv")
    .and_then(Value::as_str)
    .ok_or_else(|| invalid_epk("missing `crv`"))?;
  let curve = EcCurve::from_crv_name(crv).ok_or_else(|| invalid_epk("unsupported curve"))?;
  let x = coordinate(epk, "x", curve)?;
  let y = coordinate(epk, "y", curve)?;

  let shared = match key.to_ec_secret()? {
    EcSecretKey::P256(sk) if curve == EcCurve::P256 => {
      let point = p256::EncodedPoint::from_affine_coordinates(x.as_slice().into(), y.as_slice().into(), false);
      let pk = Option::<p256::PublicKey>::from(p256::PublicKey::from_encoded_point(&point))
        .ok_or_else(|| invalid_epk("not a point on the curve"))?;
      let shared = p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
      SecretBuffer::from_slice(shared.raw_secret_bytes().as_slice())
    }
    EcSecretKey::P384(sk) if curve == EcCurve::P384 => {
      let point = p384::EncodedPoint::from_affine_coordinates(x.as_slice().into(), y.as_slice().into(), false);
      let pk = Option::<p384::PublicKey>::from(p384::PublicKey::from_encoded_point(&point))
        .ok_or_else(|| invalid_epk("not a point on the curve"))?;
      let shared = p384::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
      SecretBuffer::from_slice(shared.raw_secret_bytes().as_slice())
    }
    EcSecretKey::P521(sk) if curve == EcCurve::P521 => {
      let point = p521::EncodedPoint::from_affine_coordinates(x.as_slice().into(), y.as_slice().into(), false);
      let pk = Option::<p521::PublicKey>::from(p521::PublicKey::from_encoded_point(&point))
        .ok_or_else(|| invalid_epk("not a point on the curve"))?;
      let shared = p521::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
      SecretBuffer::from_slice(shared.raw_secret_bytes().as_slice())
    }
    _ => {
      return Err(JoseError::InvalidKey(format!(
        "Static key curve does not match the {} ephemeral key",
        curve.crv_name()
      )))
    }
  };
  Ok(concat_kdf(&shared, algorithm_id, &apu, &apv, key_data_len))
}

/// Concat KDF (NIST SP 800-56A) keyed with SHA-256, as JWA prescribes
fn concat_kdf(z: &[u8], algorithm_id: &str, apu: &[u8], apv: &[u8], key_data_len: usize) -> SecretBuffer {
  let mut out = SecretBuffer::zeroed(key_data_len);
  let mut offset = 0usize;
  for round in 1..=key_data_len.div_ceil(32) as u32 {
    let mut hasher = Sha256::new();
    hasher.update(round.to_be_bytes());
    hasher.update(z);
    hasher.update((algorithm_id.len() as u32).to_be_bytes());
    hasher.update(algorithm_id.as_bytes());
    hasher.update((apu.len() as u32).to_be_bytes());
    hasher.update(apu);
    hasher.update((apv.len() as u32).to_be_bytes());
    hasher.update(apv);
    hasher.update(((key_data_len * 8) as u32).to_be_bytes());
    let block = hasher.finalize();
    let take = (key_data_len - offset).min(32);
    out[offset..offset + take].copy_from_slice(&block[..take]);
    offset += take;
  }
  out
}

fn party_info(header: &JoseHeader) -> JoseResult<(Vec<u8>, Vec<u8>)> {
  Ok((
    header.bytes_field("apu")?.unwrap_or_default(),
    header.bytes_field("apv")?.unwrap_or_default(),
  ))
}

fn epk_json(curve: EcCurve, x: &[u8], y: &[u8]) -> Value {
  json!({
    "kty": "EC",
    "crv": curve.crv_name(),
    "x": b64url_encode(x),
    "y": b64url_encode(y),
  })
}

fn coordinate(epk: &serde_json::Map<String, Value>, name: &str, curve: EcCurve) -> JoseResult<Vec<u8>> {
  let encoded = epk
    .get(name)
    .and_then(Value::as_str)
    .ok_or_else(|| invalid_epk(format!("missing `{name}` coordinate")))?;
  let bytes = b64url_decode(encoded).map_err(|_| invalid_epk(format!("`{name}` is not valid base64url")))?;
  if bytes.len() != curve.field_size_bytes() {
    return Err(invalid_epk(format!(
      "`{name}` must be {} bytes on {}",
      curve.field_size_bytes(),
      curve.crv_name()
    )));
  }
  Ok(bytes)
}

fn invalid_epk(reason: impl Into<String>) -> JoseError {
  JoseError::InvalidHeaderField {
    field: "epk",
    reason: reason.into(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn concat_kdf_is_deterministic_and_length_exact() {
    let z = [1u8; 32];
    let a = concat_kdf(&z, "A128GCM", b"", b"", 16);
    let b = concat_kdf(&z, "A128GCM", b"", b"", 16);
    assert_eq!(a.as_slice(), b.as_slice());
    assert_eq!(a.len(), 16);

    // output spanning several hash blocks
    let long = concat_kdf(&z, "A256CBC-HS512", b"", b"", 64);
    assert_eq!(long.len(), 64);
    assert_ne!(&long[..32], &long[32..]);
  }

  #[test]
  fn concat_kdf_separates_party_info() {
    let z = [7u8; 48];
    let plain = concat_kdf(&z, "ECDH-ES+A128KW", b"", b"", 16);
    let with_apu = concat_kdf(&z, "ECDH-ES+A128KW", b"Alice", b"", 16);
    assert_ne!(plain.as_slice(), with_apu.as_slice());
  }
}
