//! Order identifier generation.

use common::OrderId;
use rand::{TryRngCore, rngs::OsRng};
use thiserror::Error;

/// Default identifier length.
pub const DEFAULT_ID_LENGTH: usize = 21;

/// URL-safe alphabet. Its 64 symbols map one-to-one onto six random bits.
const ALPHABET: &[u8; 64] = b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// The entropy source could not produce an identifier.
#[derive(Debug, Error)]
#[error("failed to generate identifier: {0}")]
pub struct IdGenerationError(String);

impl IdGenerationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Produces order identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Result<OrderId, IdGenerationError>;
}

/// Generates compact, unguessable, URL-safe identifiers from the operating
/// system's random source.
#[derive(Debug, Clone, Copy)]
pub struct NanoIdGenerator {
    length: usize,
}

impl NanoIdGenerator {
    /// Creates a generator producing identifiers of `length` characters.
    /// A length of zero falls back to the default.
    pub fn new(length: usize) -> Self {
        let length = if length == 0 { DEFAULT_ID_LENGTH } else { length };
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for NanoIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}

impl IdGenerator for NanoIdGenerator {
    fn generate(&self) -> Result<OrderId, IdGenerationError> {
        let mut bytes = vec![0u8; self.length];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| IdGenerationError::new(e.to_string()))?;

        let id: String = bytes
            .iter()
            .map(|b| ALPHABET[usize::from(b & 63)] as char)
            .collect();
        Ok(OrderId::new(id))
    }
}
