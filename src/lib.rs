//! Passphrase-based file encryption.
//!
//! Celo encrypts files with AES-GCM, which provides both privacy and
//! integrity checks. Keys are derived from a secret phrase with Argon2id and
//! a salt that is randomized on every encryption, so even the same phrase
//! never produces the same key twice. The cipher nonce is regenerated on
//! every encryption; no nonce is ever reused.
//!
//! An encrypted file is a self-describing envelope: a 32-byte header with
//! the file signature, version and sizes, followed by the salt, the nonce
//! and the ciphertext with its authentication tag. Everything needed to
//! decrypt it — except the secret phrase — travels with the file.
//!
//! # Encrypting a single file
//!
//! ```no_run
//! use celo::Encrypter;
//!
//! # fn main() -> celo::Result<()> {
//! let mut encrypter = Encrypter::new();
//!
//! let encrypted_name = encrypter.encrypt_file(
//!     b"no amount of violence will ever solve a math problem",
//!     std::path::Path::new("book_draft.md"),
//!     true,  // overwrite "book_draft.md.celo" if it already exists
//!     false, // keep "book_draft.md" after successful encryption
//! )?;
//!
//! assert_eq!(encrypted_name.to_str(), Some("book_draft.md.celo"));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod cipher;
pub mod config;
pub mod decrypter;
pub mod encrypter;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod metadata;
pub mod phrase;
pub mod random;
mod session;

pub use config::Config;
pub use decrypter::Decrypter;
pub use encrypter::Encrypter;
pub use error::{CeloError, ErrorKind, Result};
