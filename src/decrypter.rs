//! Decryption pipeline: envelope parsing, key derivation and opening.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::cipher::Cipher;
use crate::config::Config;
use crate::error::{CeloError, ErrorKind, Result};
use crate::file_ops;
use crate::kdf;
use crate::metadata::Metadata;
use crate::session::Session;

/// Decodes and decrypts files and sources created by an
/// [`Encrypter`](crate::Encrypter).
///
/// A decrypter is a stateful session: `read` loads and validates an envelope,
/// `decrypt` derives the key and opens the ciphertext. A single instance must
/// not be shared across concurrent operations.
pub struct Decrypter {
    session: Session,
}

impl Decrypter {
    /// Creates a decrypter with the package's default configuration.
    pub fn new() -> Self {
        Self {
            session: Session::new(Config::default()),
        }
    }

    /// Creates a decrypter with a custom, validated configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            session: Session::new(config),
        })
    }

    /// Whether an envelope has been loaded and the session can decrypt.
    pub fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    /// Salt read from the loaded envelope.
    pub fn salt(&self) -> Option<&[u8]> {
        self.session.salt.as_deref()
    }

    /// The name a file gets after decryption.
    pub fn decrypted_name(&self, path: &Path) -> PathBuf {
        self.session.decrypted_name(path)
    }

    /// Primes the session with explicit salt, nonce and ciphertext values
    /// instead of parsing an envelope.
    ///
    /// Fails with a *SaltSize* or *NonceSize* error when a value doesn't
    /// match the configured sizes.
    pub fn init(
        &mut self,
        phrase: &[u8],
        salt: Vec<u8>,
        nonce: Vec<u8>,
        ciphertext: Vec<u8>,
    ) -> Result<()> {
        let op = "decrypter.init";

        if salt.len() != self.session.config.salt_size {
            return Err(CeloError::new(ErrorKind::SaltSize, op));
        }

        if nonce.len() != self.session.config.nonce_size {
            return Err(CeloError::new(ErrorKind::NonceSize, op));
        }

        let key = kdf::derive_key(phrase, &salt, self.session.config.block_size)?;
        let cipher = Cipher::new(&key)?;

        self.session.salt = Some(salt);
        self.session.nonce = Some(nonce);
        self.session.ciphertext = Some(ciphertext);
        self.session.cipher = Some(cipher);
        self.session.initialized = true;

        Ok(())
    }

    /// Creates and caches the cipher from the stored salt and the passed
    /// phrase.
    fn init_cipher(&mut self, phrase: &[u8]) -> Result<()> {
        let op = "decrypter.init_cipher";

        let salt = self
            .session
            .salt
            .as_deref()
            .ok_or_else(|| CeloError::new(ErrorKind::NotReady, op))?;

        let key = kdf::derive_key(phrase, salt, self.session.config.block_size)?;
        self.session.cipher = Some(Cipher::new(&key)?);

        Ok(())
    }

    /// Parses everything needed to decrypt from `source`: metadata, salt,
    /// nonce and ciphertext. Returns the number of bytes read.
    ///
    /// Metadata validation errors propagate as-is. A source too short for
    /// the configured salt or nonce fails with a *Salt* or *Nonce* error,
    /// and a failure while reading the remainder with a *Ciphertext* error.
    pub fn read(&mut self, source: &mut impl Read) -> Result<usize> {
        let op = "decrypter.read";

        // Validates that the source is an envelope this version can decode.
        let (_, mut n) = Metadata::decode(source)?;

        let mut salt = vec![0u8; self.session.config.salt_size];
        source
            .read_exact(&mut salt)
            .map_err(|e| CeloError::with_source(ErrorKind::Salt, op, e))?;
        n += salt.len();

        if self.session.salt.as_deref() != Some(salt.as_slice()) {
            // The key depends on the salt, so a different salt invalidates
            // the cached cipher.
            self.session.cipher = None;
            self.session.salt = Some(salt);
        }

        let mut nonce = vec![0u8; self.session.config.nonce_size];
        source
            .read_exact(&mut nonce)
            .map_err(|e| CeloError::with_source(ErrorKind::Nonce, op, e))?;
        n += nonce.len();
        self.session.nonce = Some(nonce);

        // The remaining bytes are the ciphertext.
        let mut ciphertext = Vec::new();
        source
            .read_to_end(&mut ciphertext)
            .map_err(|e| CeloError::with_source(ErrorKind::Ciphertext, op, e))?;
        n += ciphertext.len();
        self.session.ciphertext = Some(ciphertext);

        self.session.initialized = true;
        Ok(n)
    }

    /// Decrypts the loaded ciphertext with a key derived from the secret
    /// phrase and the stored salt.
    ///
    /// Fails with a *NotReady* error when no envelope has been loaded. A
    /// wrong phrase and corrupt or tampered input are indistinguishable and
    /// both fail with the generic *Decrypt* error. The plaintext is returned
    /// directly and never stored in the session, to limit the lifetime of
    /// recovered secrets.
    pub fn decrypt(&mut self, phrase: &[u8]) -> Result<Vec<u8>> {
        let op = "decrypter.decrypt";

        if !self.session.is_ready() {
            return Err(CeloError::new(ErrorKind::NotReady, op));
        }

        if self.session.cipher.is_none() {
            // Derive the key and build the cipher lazily; a cipher cached by
            // an earlier call with the same salt is reused.
            self.init_cipher(phrase)?;
        }

        let (Some(cipher), Some(nonce), Some(ciphertext)) = (
            self.session.cipher.as_ref(),
            self.session.nonce.as_deref(),
            self.session.ciphertext.as_deref(),
        ) else {
            return Err(CeloError::new(ErrorKind::NotReady, op));
        };

        cipher.decrypt(nonce, ciphertext)
    }

    /// Decrypts the file at `path`, writing the recovered plaintext to the
    /// name with the configured extension stripped, and returns that name.
    ///
    /// Overwrite handling, partial-file cleanup and source removal mirror
    /// [`Encrypter::encrypt_file`](crate::Encrypter::encrypt_file).
    pub fn decrypt_file(
        &mut self,
        phrase: &[u8],
        path: &Path,
        overwrite: bool,
        remove_source: bool,
    ) -> Result<PathBuf> {
        let op = "decrypter.decrypt_file";

        let mut source = File::open(path).map_err(|e| {
            let kind = if e.kind() == io::ErrorKind::NotFound {
                ErrorKind::NotExist
            } else {
                ErrorKind::Open
            };
            CeloError::with_source(kind, op, e).for_entity(path.display().to_string())
        })?;

        self.read(&mut source)
            .map_err(|e| e.for_entity(path.display().to_string()))?;
        drop(source);

        let plaintext = self
            .decrypt(phrase)
            .map_err(|e| e.for_entity(path.display().to_string()))?;

        let decrypted_path = self.session.decrypted_name(path);
        let (mut target, existed) = file_ops::create(&decrypted_path, overwrite)?;

        if let Err(e) = target.write_all(&plaintext) {
            drop(target);
            if !existed {
                // Remove the file when writing fails and it didn't exist
                // before.
                let _ = fs::remove_file(&decrypted_path);
            }
            return Err(CeloError::with_source(ErrorKind::Create, op, e)
                .for_entity(decrypted_path.display().to_string()));
        }
        drop(target);

        if remove_source {
            // Best effort; the plaintext is already in place.
            let _ = fs::remove_file(path);
        }

        Ok(decrypted_path)
    }

    /// Decrypts a list of files, isolating per-file failures: one file's
    /// error never aborts the rest of the batch.
    ///
    /// The returned list is index-aligned with `paths`, holding the new name
    /// for each file that was decrypted and the error for each that wasn't.
    pub fn decrypt_files(
        &mut self,
        phrase: &[u8],
        paths: &[PathBuf],
        overwrite: bool,
        remove_source: bool,
    ) -> Vec<Result<PathBuf>> {
        let op = "decrypter.decrypt_files";

        paths
            .iter()
            .map(|path| {
                self.decrypt_file(phrase, path, overwrite, remove_source)
                    .map_err(|e| {
                        CeloError::with_source(ErrorKind::Decrypt, op, e)
                            .for_entity(path.display().to_string())
                    })
            })
            .collect()
    }

    /// Clears the salt, nonce, ciphertext and cached cipher so the session
    /// can load an unrelated envelope from scratch.
    pub fn wipe(&mut self) {
        self.session.wipe();
    }
}

impl Default for Decrypter {
    fn default() -> Self {
        Self::new()
    }
}
