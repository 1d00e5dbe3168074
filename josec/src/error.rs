use thiserror::Error;

/// Result type for JOSE operations
pub type JoseResult<T> = std::result::Result<T, JoseError>;

/// Error type for JOSE operations
#[derive(Error, Debug)]
pub enum JoseError {
  /* ----- Token framing errors ----- */
  /// Token does not follow the compact serialization
  #[error("Malformed token: {0}")]
  MalformedToken(String),

  #[error("Base64 decode error: {0}")]
  Base64DecodeError(#[from] base64::DecodeError),

  /// Header is not a valid JSON object
  #[error("Malformed header: {0}")]
  MalformedHeader(String),

  /* ----- Algorithm and key errors ----- */
  /// Algorithm code is unknown, registered under another capability, or disabled
  #[error("Unsupported or disabled algorithm: {0}")]
  UnsupportedAlgorithm(String),

  /// Secret key has the wrong type or an illegal size for the chosen algorithm
  #[error("Invalid key: {0}")]
  InvalidKey(String),

  /// Invalid private key for asymmetric algorithm
  #[error("Failed to parse private key: {0}")]
  ParsePrivateKeyError(String),

  /// Invalid public key for asymmetric algorithm
  #[error("Failed to parse public key: {0}")]
  ParsePublicKeyError(String),

  /* ----- Cryptographic failures ----- */
  /// Signature or authentication tag mismatch.
  /// Carries no detail on which sub-step failed.
  #[error("Integrity check failed")]
  IntegrityFailure,

  /// Content encryption key could not be unwrapped or produced no bytes
  #[error("Encryption error")]
  EncryptionFailure,

  /* ----- Protocol violations ----- */
  /// A required header field is absent
  #[error("Missing required header field `{0}`")]
  MissingHeaderField(&'static str),

  /// A header field is present but does not satisfy its constraints
  #[error("Invalid header field `{field}`: {reason}")]
  InvalidHeaderField {
    field: &'static str,
    reason: String,
  },

  /// Any other violation of the compact JWS/JWE processing rules
  #[error("Protocol violation: {0}")]
  ProtocolViolation(String),

  /* ----- Sizing and resources ----- */
  /// Destination buffer cannot hold the output; retry with `required` bytes
  #[error("Destination buffer too small: {required} bytes required")]
  BufferTooSmall { required: usize },

  /// Payload compression or decompression failed
  #[error("Compression error: {0}")]
  CompressionError(String),

  #[error("JSON error: {0}")]
  JsonError(String),

  /* ----- Credential selection ----- */
  /// No (algorithm, key) combination satisfied the allow-lists and key constraints
  #[error("No matching credentials found")]
  NoCredentialsFound,
}
