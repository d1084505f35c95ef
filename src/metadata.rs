//! Envelope header codec.
//!
//! Every encrypted file starts with a fixed 32-byte header. Using ISO 8859-1
//! glyphs it looks like this, where `v`, `s`, `b`, `n` are the version, salt
//! size, block size and nonce size bytes:
//!
//! ```text
//! ..CELO..
//! vsbn....
//! ........
//! ........
//! ```
//!
//! The trailing 20 bytes are reserved for future format versions; they are
//! written as zeros and read back without interpretation.

use std::io::Read;

use crate::config::{AES128_BLOCK_SIZE, AES256_BLOCK_SIZE, Config};
use crate::error::{CeloError, ErrorKind, Result};

/// Size in bytes of the encoded header.
pub const SIGNATURE_SIZE: usize = 32;

/// Magic bytes that identify a file created by celo (`..CELO..`).
pub const SIGNATURE_HEADER: [u8; 8] = [0x0A, 0x1A, 0x43, 0x45, 0x4C, 0x4F, 0x0A, 0x1A];

/// Format version attached to newly encoded envelopes.
pub const VERSION: u8 = 1;

/// Minimum envelope version the running decoder supports.
pub const MIN_VERSION: u8 = 1;

/// Maximum envelope version the running decoder supports.
pub const MAX_VERSION: u8 = 1;

const RESERVED_SIZE: usize = 20;

/// Decoded form of the envelope header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    version: u8,
    salt_size: u8,
    block_size: u8,
    nonce_size: u8,
    reserved: [u8; RESERVED_SIZE],
}

impl Metadata {
    /// Creates a header from explicit field values, rejecting values the
    /// decoder would refuse to read back.
    pub fn new(version: u8, salt_size: u8, block_size: u8, nonce_size: u8) -> Result<Self> {
        validate(
            "metadata.new",
            &SIGNATURE_HEADER,
            version,
            block_size,
            nonce_size,
        )?;

        Ok(Self {
            version,
            salt_size,
            block_size,
            nonce_size,
            reserved: [0; RESERVED_SIZE],
        })
    }

    /// Creates the header for envelopes produced by the running version with
    /// the given configuration. The configuration is expected to be validated.
    pub fn for_config(config: &Config) -> Self {
        Self {
            version: VERSION,
            salt_size: config.salt_size as u8,
            block_size: config.block_size as u8,
            nonce_size: config.nonce_size as u8,
            reserved: [0; RESERVED_SIZE],
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn salt_size(&self) -> u8 {
        self.salt_size
    }

    pub fn block_size(&self) -> u8 {
        self.block_size
    }

    pub fn nonce_size(&self) -> u8 {
        self.nonce_size
    }

    /// Serializes the header into its fixed 32-byte layout: signature,
    /// version, salt size, block size, nonce size, reserved bytes.
    pub fn encode(&self) -> [u8; SIGNATURE_SIZE] {
        let mut out = [0u8; SIGNATURE_SIZE];
        out[..8].copy_from_slice(&SIGNATURE_HEADER);
        out[8] = self.version;
        out[9] = self.salt_size;
        out[10] = self.block_size;
        out[11] = self.nonce_size;
        out[12..].copy_from_slice(&self.reserved);
        out
    }

    /// Reads and validates a header from `source`, returning it along with
    /// the number of bytes consumed.
    ///
    /// Fails with a *Metadata* error when the source ends before the full
    /// header could be read, and with a *Signature*, *Incompatible*,
    /// *BlockSize* or *NonceSize* error when a field doesn't pass validation.
    pub fn decode(source: &mut impl Read) -> Result<(Self, usize)> {
        let op = "metadata.decode";
        let mut n = 0;

        // First 8 bytes are the signature header that identifies a file
        // created by celo.
        let mut signature = [0u8; 8];
        source
            .read_exact(&mut signature)
            .map_err(|e| CeloError::with_source(ErrorKind::Metadata, op, e))?;
        n += signature.len();

        // Following 4 bytes carry version, salt size, block size and nonce
        // size in that order.
        let mut vsbn = [0u8; 4];
        source
            .read_exact(&mut vsbn)
            .map_err(|e| CeloError::with_source(ErrorKind::Metadata, op, e))?;
        n += vsbn.len();

        let mut reserved = [0u8; RESERVED_SIZE];
        source
            .read_exact(&mut reserved)
            .map_err(|e| CeloError::with_source(ErrorKind::Metadata, op, e))?;
        n += reserved.len();

        let [version, salt_size, block_size, nonce_size] = vsbn;
        validate(op, &signature, version, block_size, nonce_size)?;

        Ok((
            Self {
                version,
                salt_size,
                block_size,
                nonce_size,
                reserved,
            },
            n,
        ))
    }
}

/// Validates signature, version and size fields of a header.
fn validate(
    op: &'static str,
    signature: &[u8; 8],
    version: u8,
    block_size: u8,
    nonce_size: u8,
) -> Result<()> {
    if signature != &SIGNATURE_HEADER {
        return Err(CeloError::new(ErrorKind::Signature, op));
    }

    if version < MIN_VERSION || version > MAX_VERSION {
        return Err(CeloError::new(ErrorKind::Incompatible, op));
    }

    if block_size as usize != AES128_BLOCK_SIZE && block_size as usize != AES256_BLOCK_SIZE {
        return Err(CeloError::new(ErrorKind::BlockSize, op));
    }

    if nonce_size > 32 {
        return Err(CeloError::new(ErrorKind::NonceSize, op));
    }

    Ok(())
}
