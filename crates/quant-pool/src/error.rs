//! Error types for pooling kernel construction.

use thiserror::Error;

use crate::simd::IsaVariant;
use crate::types::{Algorithm, DataType};

/// Errors that can occur while resolving and building a pooling kernel.
///
/// All of these are configuration errors: they are detected once at build
/// time and are not retryable. Execution itself never reports an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The requested SIMD variant is not available on this host.
    #[error("Unsupported instruction set: {0} is not available on this host")]
    UnsupportedInstructionSet(IsaVariant),

    /// No SIMD variant at all is available on this host.
    #[error("Unsupported instruction set: no pooling instruction set available on this host")]
    NoInstructionSet,

    /// Algorithm name outside the supported set.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Source/destination data-type combination outside the supported set.
    #[error("Unsupported data type for {algorithm}: src={src}, dst={dst}")]
    UnsupportedDataType {
        algorithm: Algorithm,
        src: DataType,
        dst: DataType,
    },

    /// Descriptors are inconsistent with each other.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// A kernel option is out of range or malformed.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// Result type for pooling kernel construction.
pub type Result<T> = std::result::Result<T, PoolError>;
