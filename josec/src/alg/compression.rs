use std::io::{Read, Write};

use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};

use crate::{
  buffer::SecretBuffer,
  error::{JoseError, JoseResult},
  header::JoseHeader,
};

/// Cap on the inflated payload, so a hostile token cannot balloon memory
const MAX_DECOMPRESSED_SIZE: u64 = 8 * 1024 * 1024;

/// Payload compression applied before encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionAlgorithm {
  /// Pass-through, no `zip` header field
  #[default]
  Identity,
  /// Raw DEFLATE (RFC 1951), announced as `zip: "DEF"`
  Deflate,
}

impl CompressionAlgorithm {
  pub const ALL: &'static [Self] = &[Self::Identity, Self::Deflate];

  /// Registry code; the identity transform has none and never appears in a
  /// header
  pub fn code(&self) -> Option<&'static str> {
    match self {
      Self::Identity => None,
      Self::Deflate => Some("DEF"),
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code {
      "DEF" => Some(Self::Deflate),
      _ => None,
    }
  }

  /// Compress the plaintext, recording the `zip` field when the transform is
  /// not the identity. Runs before the AAD is computed, so the field is
  /// authenticated.
  pub fn compress(&self, header: &mut JoseHeader, plaintext: &[u8]) -> JoseResult<SecretBuffer> {
    match self {
      Self::Identity => Ok(SecretBuffer::from_slice(plaintext)),
      Self::Deflate => {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
          .write_all(plaintext)
          .and_then(|_| encoder.finish())
          .map(|compressed| {
            header.set_str("zip", "DEF");
            SecretBuffer::from_vec(compressed)
          })
          .map_err(|e| JoseError::CompressionError(e.to_string()))
      }
    }
  }

  /// Decompress into `destination`, bounded against decompression bombs
  pub fn decompress(&self, compressed: &[u8], destination: &mut Vec<u8>) -> JoseResult<()> {
    match self {
      Self::Identity => {
        destination.extend_from_slice(compressed);
        Ok(())
      }
      Self::Deflate => {
        let start = destination.len();
        let mut decoder = DeflateDecoder::new(compressed).take(MAX_DECOMPRESSED_SIZE + 1);
        decoder
          .read_to_end(destination)
          .map_err(|e| JoseError::CompressionError(e.to_string()))?;
        if (destination.len() - start) as u64 > MAX_DECOMPRESSED_SIZE {
          return Err(JoseError::CompressionError(
            "inflated payload exceeds the decompression bound".to_string(),
          ));
        }
        Ok(())
      }
    }
  }
}
