//! Encryption pipeline: salt generation, key derivation, sealing and
//! envelope serialization.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::cipher::Cipher;
use crate::config::Config;
use crate::error::{CeloError, ErrorKind, Result};
use crate::file_ops;
use crate::kdf;
use crate::metadata::Metadata;
use crate::random::{OsRandom, SecureRandom};
use crate::session::Session;

/// Encrypts and encodes files and in-memory sources.
///
/// An encrypter is a stateful session: `init` readies a salt, key and cipher,
/// `encrypt` seals plaintext into the session, and `write` serializes the
/// envelope. The file workflows drive these steps in order. A single
/// instance must not be shared across concurrent operations.
pub struct Encrypter {
    session: Session,
    random: Box<dyn SecureRandom>,
}

impl Encrypter {
    /// Creates an encrypter with the package's default configuration.
    pub fn new() -> Self {
        Self {
            session: Session::new(Config::default()),
            random: Box::new(OsRandom),
        }
    }

    /// Creates an encrypter with a custom, validated configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            session: Session::new(config),
            random: Box::new(OsRandom),
        })
    }

    /// Creates an encrypter drawing salts and nonces from the provided
    /// random source instead of the operating system CSPRNG.
    pub fn with_random(config: Config, random: Box<dyn SecureRandom>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            session: Session::new(config),
            random,
        })
    }

    /// Whether the session holds a salt, key and cipher ready to encrypt.
    pub fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    /// Salt used to derive the current key.
    pub fn salt(&self) -> Option<&[u8]> {
        self.session.salt.as_deref()
    }

    /// Nonce generated by the most recent encryption.
    pub fn nonce(&self) -> Option<&[u8]> {
        self.session.nonce.as_deref()
    }

    /// The name a file gets after encryption.
    pub fn encrypted_name(&self, path: &Path) -> PathBuf {
        self.session.encrypted_name(path)
    }

    /// Initializes the session: generates a salt, derives a key from the
    /// secret phrase and constructs the cipher.
    ///
    /// When the session is already initialized and the preserve-key option
    /// is set, the existing salt and cipher are reused and no randomness is
    /// consumed, letting one key encrypt many files.
    pub fn init(&mut self, phrase: &[u8]) -> Result<()> {
        if self.session.initialized && self.session.config.preserve_key {
            return Ok(());
        }

        let op = "encrypter.init";

        // The salt is randomized on every initialization so the same phrase
        // never produces the same key twice.
        let mut salt = vec![0u8; self.session.config.salt_size];
        self.random
            .fill(&mut salt)
            .map_err(|e| CeloError::with_source(ErrorKind::Salt, op, e))?;

        let key = kdf::derive_key(phrase, &salt, self.session.config.block_size)?;
        let cipher = Cipher::new(&key)?;

        self.session.salt = Some(salt);
        self.session.cipher = Some(cipher);
        self.session.initialized = true;

        Ok(())
    }

    /// Encrypts plaintext with a key derived from the secret phrase,
    /// storing the generated nonce and ciphertext in the session and
    /// returning the ciphertext.
    pub fn encrypt(&mut self, phrase: &[u8], plaintext: &[u8]) -> Result<&[u8]> {
        self.init(phrase)?;

        let op = "encrypter.encrypt";
        let cipher = self
            .session
            .cipher
            .as_ref()
            .ok_or_else(|| CeloError::new(ErrorKind::NotReady, op))?;

        let (nonce, ciphertext) = cipher.encrypt(self.random.as_mut(), plaintext, &[])?;

        // The nonce is kept so it can be attached to the envelope in the
        // encoding step.
        self.session.nonce = Some(nonce);
        Ok(self.session.ciphertext.insert(ciphertext))
    }

    /// Serializes metadata, salt, nonce and ciphertext, in that order, to
    /// `sink` so the envelope can be parsed back by a
    /// [`Decrypter`](crate::Decrypter).
    ///
    /// Returns the number of bytes written. Fails with a *NotReady* error
    /// when the session has nothing to encode, and with an *Encode* error
    /// noting how many bytes were flushed when the sink fails partway.
    pub fn write(&self, sink: &mut impl Write) -> Result<usize> {
        let op = "encrypter.write";

        if !self.session.is_ready() {
            return Err(CeloError::new(ErrorKind::NotReady, op));
        }
        let (Some(salt), Some(nonce), Some(ciphertext)) = (
            self.session.salt.as_deref(),
            self.session.nonce.as_deref(),
            self.session.ciphertext.as_deref(),
        ) else {
            return Err(CeloError::new(ErrorKind::NotReady, op));
        };

        let encode_error = |flushed: usize, e| {
            CeloError::with_detail_and_source(
                ErrorKind::Encode,
                op,
                format!("{flushed} bytes flushed before failure"),
                e,
            )
        };

        let mut n = 0;

        // The metadata carries the file signature along with the version
        // and sizes in the first 32 bytes.
        let header = Metadata::for_config(&self.session.config).encode();
        sink.write_all(&header).map_err(|e| encode_error(n, e))?;
        n += header.len();

        // Salt is required to re-derive the key at decryption.
        sink.write_all(salt).map_err(|e| encode_error(n, e))?;
        n += salt.len();

        // Nonce is required to open the ciphertext.
        sink.write_all(nonce).map_err(|e| encode_error(n, e))?;
        n += nonce.len();

        sink.write_all(ciphertext).map_err(|e| encode_error(n, e))?;
        n += ciphertext.len();

        Ok(n)
    }

    /// Encrypts the file at `path`, writing the envelope next to it with
    /// the configured extension appended, and returns the new name.
    ///
    /// An existing target is only replaced when `overwrite` is set. When the
    /// write fails and the target did not exist before, the partial file is
    /// removed. On success the source file is deleted if `remove_source` is
    /// set.
    pub fn encrypt_file(
        &mut self,
        phrase: &[u8],
        path: &Path,
        overwrite: bool,
        remove_source: bool,
    ) -> Result<PathBuf> {
        let op = "encrypter.encrypt_file";

        let mut source = File::open(path).map_err(|e| {
            let kind = if e.kind() == io::ErrorKind::NotFound {
                ErrorKind::NotExist
            } else {
                ErrorKind::Open
            };
            CeloError::with_source(kind, op, e).for_entity(path.display().to_string())
        })?;
        let mut plaintext = Vec::new();
        source.read_to_end(&mut plaintext).map_err(|e| {
            CeloError::with_source(ErrorKind::Plaintext, op, e)
                .for_entity(path.display().to_string())
        })?;
        drop(source);

        // Salt and nonce are generated inside the encryption step, unless
        // the preserve-key flag keeps the current key.
        self.encrypt(phrase, &plaintext)
            .map_err(|e| e.for_entity(path.display().to_string()))?;

        let encrypted_path = self.session.encrypted_name(path);
        let (mut target, existed) = file_ops::create(&encrypted_path, overwrite)?;

        if let Err(err) = self.write(&mut target) {
            drop(target);
            if !existed {
                // Remove the file when writing fails and it didn't exist
                // before.
                let _ = fs::remove_file(&encrypted_path);
            }
            return Err(err.for_entity(encrypted_path.display().to_string()));
        }
        drop(target);

        if remove_source {
            // Best effort; the envelope is already in place.
            let _ = fs::remove_file(path);
        }

        Ok(encrypted_path)
    }

    /// Encrypts a list of files, isolating per-file failures: one file's
    /// error never aborts the rest of the batch.
    ///
    /// The returned list is index-aligned with `paths`, holding the new name
    /// for each file that was encrypted and the error for each that wasn't.
    pub fn encrypt_files(
        &mut self,
        phrase: &[u8],
        paths: &[PathBuf],
        overwrite: bool,
        remove_source: bool,
    ) -> Vec<Result<PathBuf>> {
        let op = "encrypter.encrypt_files";

        paths
            .iter()
            .map(|path| {
                self.encrypt_file(phrase, path, overwrite, remove_source)
                    .map_err(|e| {
                        CeloError::with_source(ErrorKind::Encrypt, op, e)
                            .for_entity(path.display().to_string())
                    })
            })
            .collect()
    }

    /// Clears the salt, nonce, ciphertext and cached cipher so the next
    /// `init` starts from a fresh salt and key.
    pub fn wipe(&mut self) {
        self.session.wipe();
    }
}

impl Default for Encrypter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::NONCE_SIZE;
    use crate::metadata::{SIGNATURE_HEADER, SIGNATURE_SIZE};
    use crate::random::FixedRandom;

    fn fixture_encrypter(random_bytes: Vec<u8>, preserve_key: bool) -> Encrypter {
        let config = Config {
            preserve_key,
            ..Config::default()
        };
        Encrypter::with_random(config, Box::new(FixedRandom::new(random_bytes))).unwrap()
    }

    #[test]
    fn write_accounts_every_byte() {
        let mut encrypter = Encrypter::new();
        let ciphertext_len = encrypter.encrypt(b"phrase", b"some plaintext").unwrap().len();

        let mut envelope = Vec::new();
        let n = encrypter.write(&mut envelope).unwrap();

        assert_eq!(n, SIGNATURE_SIZE + 32 + NONCE_SIZE + ciphertext_len);
        assert_eq!(n, envelope.len());
    }

    #[test]
    fn write_before_encrypt_is_not_ready() {
        let encrypter = Encrypter::new();
        let mut sink = Vec::new();

        let err = encrypter.write(&mut sink).expect_err("expected not ready");
        assert_eq!(err.kind, ErrorKind::NotReady);
    }

    #[test]
    fn write_after_init_alone_is_not_ready() {
        let mut encrypter = Encrypter::new();
        encrypter.init(b"phrase").unwrap();

        let mut sink = Vec::new();
        let err = encrypter.write(&mut sink).expect_err("expected not ready");
        assert_eq!(err.kind, ErrorKind::NotReady);
    }

    #[test]
    fn fresh_salt_and_nonce_per_encryption() {
        let mut encrypter = Encrypter::new();

        let ct1 = encrypter.encrypt(b"phrase", b"same input").unwrap().to_vec();
        let salt1 = encrypter.salt().unwrap().to_vec();
        let nonce1 = encrypter.nonce().unwrap().to_vec();

        let ct2 = encrypter.encrypt(b"phrase", b"same input").unwrap().to_vec();
        let salt2 = encrypter.salt().unwrap().to_vec();
        let nonce2 = encrypter.nonce().unwrap().to_vec();

        assert_ne!(salt1, salt2);
        assert_ne!(nonce1, nonce2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn preserve_key_reuses_salt_without_new_randomness() {
        // Exactly one salt and two nonces worth of random bytes: a second
        // salt draw would exhaust the source and fail.
        let budget = 32 + NONCE_SIZE + NONCE_SIZE;
        let mut encrypter = fixture_encrypter(vec![0x5A; budget], true);

        encrypter.encrypt(b"phrase", b"first file").unwrap();
        let salt1 = encrypter.salt().unwrap().to_vec();

        encrypter.encrypt(b"phrase", b"second file").unwrap();
        let salt2 = encrypter.salt().unwrap().to_vec();

        assert_eq!(salt1, salt2);
    }

    #[test]
    fn salt_rng_failure_is_a_salt_error() {
        // Not enough bytes for even one salt.
        let mut encrypter = fixture_encrypter(vec![0u8; 8], false);

        let err = encrypter.init(b"phrase").expect_err("expected salt error");
        assert_eq!(err.kind, ErrorKind::Salt);
        assert!(!encrypter.is_ready());
    }

    #[test]
    fn nonce_rng_failure_is_a_nonce_error() {
        // Enough for the salt, not enough for the nonce.
        let mut encrypter = fixture_encrypter(vec![0u8; 32 + 4], false);

        let err = encrypter
            .encrypt(b"phrase", b"plaintext")
            .expect_err("expected nonce error");
        assert_eq!(err.kind, ErrorKind::Nonce);
    }

    #[test]
    fn envelope_layout_is_deterministic_with_fixed_randomness() {
        let mut random_bytes = vec![0x42u8; 32];
        random_bytes.extend_from_slice(&[0x24u8; NONCE_SIZE]);
        let mut encrypter = fixture_encrypter(random_bytes, false);

        encrypter.encrypt(b"phrase", b"payload").unwrap();
        let mut envelope = Vec::new();
        encrypter.write(&mut envelope).unwrap();

        assert_eq!(&envelope[..8], &SIGNATURE_HEADER);
        assert_eq!(&envelope[8..12], &[1, 32, 32, NONCE_SIZE as u8]);
        assert_eq!(&envelope[SIGNATURE_SIZE..SIGNATURE_SIZE + 32], &[0x42u8; 32]);
        assert_eq!(
            &envelope[SIGNATURE_SIZE + 32..SIGNATURE_SIZE + 32 + NONCE_SIZE],
            &[0x24u8; NONCE_SIZE]
        );
    }

    #[test]
    fn wipe_resets_session_for_fresh_salt() {
        let mut encrypter = Encrypter::new();
        encrypter.encrypt(b"phrase", b"payload").unwrap();
        let salt1 = encrypter.salt().unwrap().to_vec();

        encrypter.wipe();
        assert!(!encrypter.is_ready());
        assert!(encrypter.salt().is_none());

        encrypter.encrypt(b"phrase", b"payload").unwrap();
        let salt2 = encrypter.salt().unwrap().to_vec();
        assert_ne!(salt1, salt2);
    }

    #[test]
    fn aes128_block_size_produces_valid_envelope() {
        let config = Config {
            block_size: 16,
            ..Config::default()
        };
        let mut encrypter = Encrypter::with_config(config).unwrap();

        encrypter.encrypt(b"phrase", b"payload").unwrap();
        let mut envelope = Vec::new();
        let n = encrypter.write(&mut envelope).unwrap();

        assert_eq!(envelope[10], 16);
        assert_eq!(n, envelope.len());
    }
}
