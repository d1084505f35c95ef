//! Key derivation from a secret phrase.

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use crate::error::{CeloError, ErrorKind, Result};

/// Argon2id time cost (iterations).
const TIME_COST: u32 = 1;

/// Argon2id memory cost in KiB (64 MiB).
const MEM_COST_KIB: u32 = 64 * 1024;

/// Argon2id degree of parallelism.
const LANES: u32 = 4;

/// Derives a key of `length` bytes from a phrase and a salt using Argon2id.
///
/// Deterministic: identical inputs always yield identical output. The
/// memory-hard parameters make brute-force phrase guessing expensive. The
/// returned key is wiped from memory when dropped.
pub fn derive_key(phrase: &[u8], salt: &[u8], length: usize) -> Result<Zeroizing<Vec<u8>>> {
    let op = "kdf.derive_key";

    let params = Params::new(MEM_COST_KIB, TIME_COST, LANES, Some(length))
        .map_err(|e| CeloError::with_detail(ErrorKind::Internal, op, e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new(vec![0u8; length]);
    argon2
        .hash_password_into(phrase, salt, key.as_mut_slice())
        .map_err(|e| CeloError::with_detail(ErrorKind::Internal, op, e.to_string()))?;

    Ok(key)
}
