//! Authenticated encryption on top of AES-GCM.
//!
//! GCM provides integrity checks (authentication) in addition to privacy,
//! so decryption never hands back unverified plaintext.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};

use crate::config::{AES128_BLOCK_SIZE, AES256_BLOCK_SIZE};
use crate::error::{CeloError, ErrorKind, Result};
use crate::random::SecureRandom;

/// Nonce length in bytes recommended for AES-GCM (96 bits).
pub const NONCE_SIZE: usize = 12;

enum Backend {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Aes128(_) => f.write_str("Aes128(..)"),
            Backend::Aes256(_) => f.write_str("Aes256(..)"),
        }
    }
}

/// A pre-configured AEAD cipher holding a derived key.
pub struct Cipher {
    backend: Backend,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("backend", &self.backend).finish()
    }
}

impl Cipher {
    /// Creates an AES-GCM cipher from a derived key. The key length selects
    /// the underlying block-cipher strength: 16 bytes for AES-128-GCM and
    /// 32 bytes for AES-256-GCM.
    pub fn new(key: &[u8]) -> Result<Self> {
        let op = "cipher.new";

        let backend = match key.len() {
            AES128_BLOCK_SIZE => Aes128Gcm::new_from_slice(key).map(Backend::Aes128),
            AES256_BLOCK_SIZE => Aes256Gcm::new_from_slice(key).map(Backend::Aes256),
            _ => return Err(CeloError::new(ErrorKind::BlockSize, op)),
        }
        .map_err(|e| CeloError::with_detail(ErrorKind::Cipher, op, e.to_string()))?;

        Ok(Self { backend })
    }

    /// Key length of the underlying block cipher.
    pub fn block_size(&self) -> usize {
        match self.backend {
            Backend::Aes128(_) => AES128_BLOCK_SIZE,
            Backend::Aes256(_) => AES256_BLOCK_SIZE,
        }
    }

    /// Nonce length used by this cipher.
    pub fn nonce_size(&self) -> usize {
        NONCE_SIZE
    }

    /// Encrypts plaintext, returning the generated nonce and the ciphertext
    /// with the authentication tag embedded at the tail.
    ///
    /// A new nonce is drawn from `random` on every call, so nonces are never
    /// reused for a given key. Fails with a *Nonce* error when the random
    /// source cannot supply enough bytes.
    pub fn encrypt(
        &self,
        random: &mut dyn SecureRandom,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let op = "cipher.encrypt";

        let mut nonce = [0u8; NONCE_SIZE];
        random
            .fill(&mut nonce)
            .map_err(|e| CeloError::with_source(ErrorKind::Nonce, op, e))?;

        let payload = Payload {
            msg: plaintext,
            aad: associated_data,
        };
        let ciphertext = match &self.backend {
            Backend::Aes128(aead) => aead.encrypt(Nonce::from_slice(&nonce), payload),
            Backend::Aes256(aead) => aead.encrypt(Nonce::from_slice(&nonce), payload),
        }
        .map_err(|e| CeloError::with_detail(ErrorKind::Encrypt, op, e.to_string()))?;

        Ok((nonce.to_vec(), ciphertext))
    }

    /// Decrypts the ciphertext using the passed nonce, verifying the
    /// authentication tag.
    ///
    /// Every failure collapses into the same generic *Decrypt* error: a
    /// wrong passphrase and tampered or corrupt input are indistinguishable
    /// on purpose, so callers cannot be used as a decryption oracle.
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let op = "cipher.decrypt";

        if nonce.len() != NONCE_SIZE {
            return Err(CeloError::new(ErrorKind::Decrypt, op));
        }

        match &self.backend {
            Backend::Aes128(aead) => aead.decrypt(Nonce::from_slice(nonce), ciphertext),
            Backend::Aes256(aead) => aead.decrypt(Nonce::from_slice(nonce), ciphertext),
        }
        .map_err(|_| CeloError::new(ErrorKind::Decrypt, op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::OsRandom;

    #[test]
    fn roundtrip_aes256() {
        let cipher = Cipher::new(&[0x11u8; 32]).unwrap();
        let (nonce, ciphertext) = cipher.encrypt(&mut OsRandom, b"attack at dawn", b"").unwrap();

        assert_eq!(nonce.len(), NONCE_SIZE);
        let plaintext = cipher.decrypt(&nonce, &ciphertext).unwrap();
        assert_eq!(plaintext, b"attack at dawn");
    }

    #[test]
    fn roundtrip_aes128() {
        let cipher = Cipher::new(&[0x22u8; 16]).unwrap();
        let (nonce, ciphertext) = cipher.encrypt(&mut OsRandom, b"attack at dawn", b"").unwrap();

        let plaintext = cipher.decrypt(&nonce, &ciphertext).unwrap();
        assert_eq!(plaintext, b"attack at dawn");
    }

    #[test]
    fn ciphertext_embeds_tag() {
        let cipher = Cipher::new(&[0x11u8; 32]).unwrap();
        let (_, ciphertext) = cipher.encrypt(&mut OsRandom, b"payload", b"").unwrap();

        // GCM appends a 16-byte authentication tag.
        assert_eq!(ciphertext.len(), b"payload".len() + 16);
    }

    #[test]
    fn fresh_nonce_on_every_call() {
        let cipher = Cipher::new(&[0x11u8; 32]).unwrap();
        let (nonce1, ct1) = cipher.encrypt(&mut OsRandom, b"same input", b"").unwrap();
        let (nonce2, ct2) = cipher.encrypt(&mut OsRandom, b"same input", b"").unwrap();

        assert_ne!(nonce1, nonce2);
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn rejects_unsupported_key_length() {
        let err = Cipher::new(&[0u8; 24]).expect_err("expected block size error");
        assert_eq!(err.kind, ErrorKind::BlockSize);
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let cipher = Cipher::new(&[0x11u8; 32]).unwrap();
        let (nonce, mut ciphertext) = cipher.encrypt(&mut OsRandom, b"payload", b"").unwrap();

        ciphertext[0] ^= 0x01;
        let err = cipher
            .decrypt(&nonce, &ciphertext)
            .expect_err("expected decrypt error");
        assert_eq!(err.kind, ErrorKind::Decrypt);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let cipher = Cipher::new(&[0x11u8; 32]).unwrap();
        let (nonce, ciphertext) = cipher.encrypt(&mut OsRandom, b"payload", b"").unwrap();

        let other = Cipher::new(&[0x12u8; 32]).unwrap();
        let err = other
            .decrypt(&nonce, &ciphertext)
            .expect_err("expected decrypt error");
        assert_eq!(err.kind, ErrorKind::Decrypt);
    }

    #[test]
    fn malformed_nonce_fails_decryption() {
        let cipher = Cipher::new(&[0x11u8; 32]).unwrap();
        let (_, ciphertext) = cipher.encrypt(&mut OsRandom, b"payload", b"").unwrap();

        let err = cipher
            .decrypt(&[0u8; 8], &ciphertext)
            .expect_err("expected decrypt error");
        assert_eq!(err.kind, ErrorKind::Decrypt);
    }
}
