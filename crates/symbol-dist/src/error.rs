//! Error types for distribution operations.
//!
//! Recoverable failures are returned as [`DistError`]. Broken internal
//! invariants (sampling from weights that sum below one, counting into a
//! distribution that was never registered) panic instead: they mean a caller
//! bypassed the protocol, and no return value would be trustworthy.

use symbol_core::SymbolError;
use thiserror::Error;

/// Errors that can occur when querying, mutating or training a distribution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistError {
    /// The symbol does not belong to, or cannot be resolved against, the alphabet.
    #[error("Symbol {symbol} is not in alphabet {alphabet}")]
    InvalidSymbol { symbol: String, alphabet: String },

    /// Two objects expected to share an alphabet do not.
    #[error("Alphabet mismatch: expected {expected}, got {got}")]
    IncompatibleAlphabet { expected: String, got: String },

    /// A mutation was vetoed, by an immutable variant or by a listener.
    /// The target is unchanged.
    #[error("Change rejected: {reason}")]
    ChangeRejected { reason: String },
}

impl DistError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        DistError::ChangeRejected {
            reason: reason.into(),
        }
    }
}

impl From<SymbolError> for DistError {
    fn from(err: SymbolError) -> Self {
        match err {
            SymbolError::InvalidSymbol { symbol, alphabet } => {
                DistError::InvalidSymbol { symbol, alphabet }
            }
            SymbolError::IncompatibleAlphabet { expected, got } => {
                DistError::IncompatibleAlphabet { expected, got }
            }
        }
    }
}
