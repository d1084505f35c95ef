//! Engine configuration.
//!
//! Replaces ad-hoc per-call options with one explicit structure validated at
//! construction time. A [`Config`] is copied into every session, so a session
//! keeps behaving the same even if the caller builds new configurations.

use crate::cipher;
use crate::error::{CeloError, ErrorKind, Result};

/// Key length for AES-256-GCM, the default cipher strength.
pub const AES256_BLOCK_SIZE: usize = 32;

/// Key length for AES-128-GCM.
pub const AES128_BLOCK_SIZE: usize = 16;

/// Default salt length used to derive cipher keys from a phrase.
pub const DEFAULT_SALT_SIZE: usize = 32;

/// Extension attached to encrypted files.
///  - secrets.txt -> secrets.txt.celo
pub const DEFAULT_EXTENSION: &str = "celo";

/// Sizes and naming policy shared by [`Encrypter`](crate::Encrypter) and
/// [`Decrypter`](crate::Decrypter) sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Salt length in bytes; persisted in the envelope header, so it must
    /// fit in one byte.
    pub salt_size: usize,
    /// Derived key length in bytes. 16 selects AES-128-GCM, 32 AES-256-GCM.
    pub block_size: usize,
    /// Nonce length in bytes.
    pub nonce_size: usize,
    /// Extension attached to encrypted files. An empty extension leaves file
    /// names unchanged in both directions.
    pub extension: String,
    /// Reuse the salt and cached cipher across encryption calls on the same
    /// session, trading per-file key uniqueness for throughput.
    pub preserve_key: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            salt_size: DEFAULT_SALT_SIZE,
            block_size: AES256_BLOCK_SIZE,
            nonce_size: cipher::NONCE_SIZE,
            extension: DEFAULT_EXTENSION.to_string(),
            preserve_key: false,
        }
    }
}

impl Config {
    /// Checks that the configured sizes can actually be encoded and used by
    /// the cipher.
    pub fn validate(&self) -> Result<()> {
        let op = "config.validate";

        if self.block_size != AES128_BLOCK_SIZE && self.block_size != AES256_BLOCK_SIZE {
            return Err(CeloError::new(ErrorKind::BlockSize, op));
        }

        // The header stores the salt size in a single byte.
        if self.salt_size == 0 || self.salt_size > u8::MAX as usize {
            return Err(CeloError::new(ErrorKind::SaltSize, op));
        }

        // The header field allows future nonce sizes, but GCM only accepts
        // its standard nonce today.
        if self.nonce_size != cipher::NONCE_SIZE {
            return Err(CeloError::new(ErrorKind::NonceSize, op));
        }

        Ok(())
    }
}
