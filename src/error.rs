use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Fine-grained condition tags for consumers that want to branch on error
/// kinds. The `#[error]` attribute on each variant doubles as the canonical
/// user-facing message for that kind, so the kind-to-message mapping is
/// exhaustive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    // Validation failures.
    /// The first 8 bytes of the input are not the celo signature.
    #[error("file signature is invalid")]
    Signature,
    /// The 32-byte header could not be read in full.
    #[error("metadata is invalid")]
    Metadata,
    /// The input was produced by an unsupported format version.
    #[error("incompatible version")]
    Incompatible,
    /// Block size byte is not one of the supported cipher strengths.
    #[error("block size is invalid")]
    BlockSize,
    /// Nonce size byte is out of bounds, or a provided nonce has the wrong length.
    #[error("nonce size is invalid")]
    NonceSize,
    /// A provided salt has a length other than the configured salt size.
    #[error("salt size is invalid")]
    SaltSize,
    /// A source selector is not a valid glob pattern.
    #[error("invalid glob pattern")]
    Pattern,

    // Resource failures.
    #[error("insufficient permissions")]
    Permissions,
    #[error("file couldn't be created")]
    Create,
    #[error("file couldn't be opened")]
    Open,
    #[error("file already exists")]
    Exist,
    #[error("file doesn't exist")]
    NotExist,
    #[error("directories are not supported")]
    IsDir,

    // Cryptographic failures.
    /// Salt could not be generated or read.
    #[error("salt is empty or invalid")]
    Salt,
    /// Nonce could not be generated or read.
    #[error("nonce is empty or invalid")]
    Nonce,
    /// Ciphertext could not be read from the envelope.
    #[error("ciphertext is invalid or corrupt")]
    Ciphertext,
    /// Plaintext could not be read from the source file.
    #[error("plaintext is invalid or corrupt")]
    Plaintext,
    /// The AEAD cipher could not be constructed from the derived key.
    #[error("cipher couldn't be created")]
    Cipher,
    #[error("unable to encrypt content")]
    Encrypt,
    /// Authentication or decryption failed. Deliberately covers both a wrong
    /// passphrase and tampered or corrupt input so callers cannot be used as
    /// a decryption oracle.
    #[error("unable to decrypt content")]
    Decrypt,
    /// Envelope serialization failed partway through.
    #[error("unable to encode content")]
    Encode,

    // State failures.
    /// An operation was invoked before the session was initialized or loaded.
    #[error("instance hasn't been initialized")]
    NotReady,

    // Phrase input failures.
    #[error("empty phrase is not allowed")]
    PhraseEmpty,
    #[error("phrases don't match")]
    PhraseMismatch,
    #[error("unable to get phrase")]
    PhraseUnavailable,

    #[error("i/o failure")]
    Io,
    #[error("internal error")]
    Internal,
}

/// Error type carried by every fallible operation in this crate.
///
/// An error records the operation that failed, optionally the file or entity
/// being processed, the kind of failure, and the underlying cause — a causal
/// chain for diagnostics that is not meant to be parsed beyond `kind`.
#[derive(Debug)]
pub struct CeloError {
    /// Condition tag, always provided.
    pub kind: ErrorKind,
    op: &'static str,
    entity: Option<String>,
    detail: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl CeloError {
    /// Creates a new error with a required kind and operation name.
    pub fn new(kind: ErrorKind, op: &'static str) -> Self {
        Self {
            kind,
            op,
            entity: None,
            detail: None,
            source: None,
        }
    }

    /// Creates a new error with a free-form detail appended to the kind's
    /// message. Used where the underlying failure only exposes a Display
    /// implementation.
    pub fn with_detail(kind: ErrorKind, op: &'static str, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(kind, op)
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        kind: ErrorKind,
        op: &'static str,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(kind, op)
        }
    }

    /// Creates a new error that carries both a free-form detail and the
    /// originating source error.
    pub fn with_detail_and_source(
        kind: ErrorKind,
        op: &'static str,
        detail: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            detail: Some(detail.into()),
            source: Some(Box::new(source)),
            ..Self::new(kind, op)
        }
    }

    /// Attaches the file name or entity being processed.
    pub fn for_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// The operation that produced the error.
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// The file name or entity being processed when the error occurred.
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

impl fmt::Display for CeloError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if let Some(entity) = &self.entity {
            write!(f, ": {entity}")?;
        }
        write!(f, ": {}", self.kind)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        if let Some(source) = &self.source {
            // Nested celo errors are indented on a new line to keep long
            // chains readable; foreign errors stay inline.
            if source.is::<CeloError>() {
                write!(f, ":\n\t{source}")?;
            } else {
                write!(f, ": {source}")?;
            }
        }
        Ok(())
    }
}

impl StdError for CeloError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|s| s as &(dyn StdError + 'static))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CeloError>;
