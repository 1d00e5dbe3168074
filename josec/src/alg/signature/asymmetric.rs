use ecdsa::signature::{DigestSigner, DigestVerifier};
use p256::NistP256;
use p384::NistP384;
use p521::NistP521;
use rand_core::OsRng;
use rsa::{Pkcs1v15Sign, Pss};
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::SignatureAlgorithm;
use crate::{
  error::{JoseError, JoseResult},
  secret_key::{AsymmetricPublicKey, AsymmetricSecretKey, EcSecretKey},
};

/// Sign with an asymmetric key, dispatching on the algorithm family
pub(super) fn sign(alg: SignatureAlgorithm, key: &AsymmetricSecretKey, input: &[u8]) -> JoseResult<Vec<u8>> {
  match alg {
    SignatureAlgorithm::Rs256
    | SignatureAlgorithm::Rs384
    | SignatureAlgorithm::Rs512
    | SignatureAlgorithm::Ps256
    | SignatureAlgorithm::Ps384
    | SignatureAlgorithm::Ps512 => sign_rsa(alg, key, input),
    SignatureAlgorithm::Es256 | SignatureAlgorithm::Es384 | SignatureAlgorithm::Es512 => sign_ecdsa(alg, key, input),
    SignatureAlgorithm::EdDsa => {
      let sk = key.to_ed25519()?;
      let sig = sk.sign(input, Some(ed25519_compact::Noise::default()));
      Ok(sig.as_ref().to_vec())
    }
    _ => unreachable!("not an asymmetric algorithm"),
  }
}

fn sign_rsa(alg: SignatureAlgorithm, key: &AsymmetricSecretKey, input: &[u8]) -> JoseResult<Vec<u8>> {
  let sk = key.to_rsa_private_key()?;
  let signed = match alg {
    SignatureAlgorithm::Rs256 => sk.sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(input)),
    SignatureAlgorithm::Rs384 => sk.sign(Pkcs1v15Sign::new::<Sha384>(), &Sha384::digest(input)),
    SignatureAlgorithm::Rs512 => sk.sign(Pkcs1v15Sign::new::<Sha512>(), &Sha512::digest(input)),
    SignatureAlgorithm::Ps256 => sk.sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), &Sha256::digest(input)),
    SignatureAlgorithm::Ps384 => sk.sign_with_rng(&mut OsRng, Pss::new::<Sha384>(), &Sha384::digest(input)),
    SignatureAlgorithm::Ps512 => sk.sign_with_rng(&mut OsRng, Pss::new::<Sha512>(), &Sha512::digest(input)),
    _ => unreachable!(),
  };
  signed.map_err(|e| JoseError::InvalidKey(e.to_string()))
}

fn sign_ecdsa(alg: SignatureAlgorithm, key: &AsymmetricSecretKey, input: &[u8]) -> JoseResult<Vec<u8>> {
  match (alg, key.to_ec_secret()?) {
    (SignatureAlgorithm::Es256, EcSecretKey::P256(sk)) => {
      let sk = ecdsa::SigningKey::from(&sk);
      let mut digest = <Sha256 as Digest>::new();
      digest.update(input);
      let sig: ecdsa::Signature<NistP256> = sk.sign_digest(digest);
      Ok(sig.to_bytes().to_vec())
    }
    (SignatureAlgorithm::Es384, EcSecretKey::P384(sk)) => {
      let sk = ecdsa::SigningKey::from(&sk);
      let mut digest = <Sha384 as Digest>::new();
      digest.update(input);
      let sig: ecdsa::Signature<NistP384> = sk.sign_digest(digest);
      Ok(sig.to_bytes().to_vec())
    }
    (SignatureAlgorithm::Es512, EcSecretKey::P521(sk)) => {
      use ecdsa::signature::hazmat::PrehashSigner;
      let sk: p521::ecdsa::SigningKey = ecdsa::SigningKey::<NistP521>::from(&sk).into();
      let digest = <Sha512 as Digest>::digest(input);
      let sig: ecdsa::Signature<NistP521> = sk
        .sign_prehash(&digest)
        .map_err(|e| JoseError::InvalidKey(e.to_string()))?;
      Ok(sig.to_bytes().to_vec())
    }
    _ => Err(JoseError::InvalidKey(format!(
      "Key curve does not match algorithm {}",
      alg.code()
    ))),
  }
}

/// Verify with the public half of the key.
/// Every mismatch surfaces as the same integrity failure.
pub(super) fn verify(
  alg: SignatureAlgorithm,
  key: &AsymmetricSecretKey,
  input: &[u8],
  signature: &[u8],
) -> JoseResult<()> {
  let public = key.public_key()?;
  match (alg, public) {
    (SignatureAlgorithm::Rs256, AsymmetricPublicKey::Rsa(pk)) => pk
      .verify(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(input), signature)
      .map_err(|_| JoseError::IntegrityFailure),
    (SignatureAlgorithm::Rs384, AsymmetricPublicKey::Rsa(pk)) => pk
      .verify(Pkcs1v15Sign::new::<Sha384>(), &Sha384::digest(input), signature)
      .map_err(|_| JoseError::IntegrityFailure),
    (SignatureAlgorithm::Rs512, AsymmetricPublicKey::Rsa(pk)) => pk
      .verify(Pkcs1v15Sign::new::<Sha512>(), &Sha512::digest(input), signature)
      .map_err(|_| JoseError::IntegrityFailure),
    (SignatureAlgorithm::Ps256, AsymmetricPublicKey::Rsa(pk)) => pk
      .verify(Pss::new::<Sha256>(), &Sha256::digest(input), signature)
      .map_err(|_| JoseError::IntegrityFailure),
    (SignatureAlgorithm::Ps384, AsymmetricPublicKey::Rsa(pk)) => pk
      .verify(Pss::new::<Sha384>(), &Sha384::digest(input), signature)
      .map_err(|_| JoseError::IntegrityFailure),
    (SignatureAlgorithm::Ps512, AsymmetricPublicKey::Rsa(pk)) => pk
      .verify(Pss::new::<Sha512>(), &Sha512::digest(input), signature)
      .map_err(|_| JoseError::IntegrityFailure),
    (SignatureAlgorithm::Es256, AsymmetricPublicKey::P256(pk)) => {
      let signature =
        ecdsa::Signature::<NistP256>::from_bytes(signature.into()).map_err(|_| JoseError::IntegrityFailure)?;
      let vk = ecdsa::VerifyingKey::from(&pk);
      let mut digest = <Sha256 as Digest>::new();
      digest.update(input);
      vk.verify_digest(digest, &signature).map_err(|_| JoseError::IntegrityFailure)
    }
    (SignatureAlgorithm::Es384, AsymmetricPublicKey::P384(pk)) => {
      let signature =
        ecdsa::Signature::<NistP384>::from_bytes(signature.into()).map_err(|_| JoseError::IntegrityFailure)?;
      let vk = ecdsa::VerifyingKey::from(&pk);
      let mut digest = <Sha384 as Digest>::new();
      digest.update(input);
      vk.verify_digest(digest, &signature).map_err(|_| JoseError::IntegrityFailure)
    }
    (SignatureAlgorithm::Es512, AsymmetricPublicKey::P521(pk)) => {
      let signature =
        ecdsa::Signature::<NistP521>::from_bytes(signature.into()).map_err(|_| JoseError::IntegrityFailure)?;
      use ecdsa::signature::hazmat::PrehashVerifier;
      let vk = ecdsa::VerifyingKey::from(&pk);
      let digest = <Sha512 as Digest>::digest(input);
      vk.verify_prehash(&digest, &signature).map_err(|_| JoseError::IntegrityFailure)
    }
    (SignatureAlgorithm::EdDsa, AsymmetricPublicKey::Ed25519(pk)) => {
      let sig = ed25519_compact::Signature::from_slice(signature).map_err(|_| JoseError::IntegrityFailure)?;
      pk.verify(input, &sig).map_err(|_| JoseError::IntegrityFailure)
    }
    _ => Err(JoseError::InvalidKey(format!(
      "Key does not match algorithm {}",
      alg.code()
    ))),
  }
}
