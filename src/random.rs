//! Secure random source used for salt and nonce generation.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{CeloError, ErrorKind, Result};

/// Capability providing cryptographically secure random bytes.
///
/// Sessions take this as a swappable dependency: production code uses
/// [`OsRandom`], while tests can substitute [`FixedRandom`] to produce
/// reproducible envelopes. Failure or exhaustion of a source is a hard
/// error, never a silent fallback to weaker randomness.
pub trait SecureRandom {
    /// Fills `dest` entirely with random bytes.
    fn fill(&mut self, dest: &mut [u8]) -> Result<()>;
}

/// The operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CeloError::with_source(ErrorKind::Io, "random.fill", e))
    }
}

/// Serves bytes from a fixed buffer and fails once the buffer is exhausted.
///
/// This source is ONLY for testing: it makes salts and nonces predictable,
/// which defeats the entire construction. Production code always uses
/// [`OsRandom`].
#[derive(Debug, Clone)]
pub struct FixedRandom {
    bytes: Vec<u8>,
    pos: usize,
}

impl FixedRandom {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Number of bytes handed out so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl SecureRandom for FixedRandom {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        let remaining = self.bytes.len() - self.pos;
        if remaining < dest.len() {
            return Err(CeloError::with_detail(
                ErrorKind::Io,
                "random.fill",
                "fixed random source exhausted",
            ));
        }

        dest.copy_from_slice(&self.bytes[self.pos..self.pos + dest.len()]);
        self.pos += dest.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_random_fills_buffer() {
        let mut rng = OsRandom;
        let mut buf = [0u8; 64];
        rng.fill(&mut buf).unwrap();
        // 64 zero bytes from a working CSPRNG is not a realistic outcome.
        assert_ne!(buf, [0u8; 64]);
    }

    #[test]
    fn fixed_random_is_sequential() {
        let mut rng = FixedRandom::new(vec![1, 2, 3, 4, 5, 6]);

        let mut first = [0u8; 4];
        rng.fill(&mut first).unwrap();
        assert_eq!(first, [1, 2, 3, 4]);
        assert_eq!(rng.consumed(), 4);

        let mut second = [0u8; 2];
        rng.fill(&mut second).unwrap();
        assert_eq!(second, [5, 6]);
    }

    #[test]
    fn fixed_random_fails_when_exhausted() {
        let mut rng = FixedRandom::new(vec![0u8; 3]);
        let mut buf = [0u8; 4];

        let err = rng.fill(&mut buf).expect_err("expected exhaustion error");
        assert_eq!(err.kind, ErrorKind::Io);
    }
}
