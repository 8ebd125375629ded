use std::fmt;
use std::str::FromStr;

use crate::error::PoolError;

/// Element data type of a tensor.
///
/// This is the library-wide set; only `S32`, `S8` and `U8` can be pooled by
/// this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    F32,
    S32,
    S16,
    S8,
    U8,
}

impl DataType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            DataType::F32 | DataType::S32 => 4,
            DataType::S16 => 2,
            DataType::S8 | DataType::U8 => 1,
        }
    }

    /// Whether integer pooling supports this type.
    pub const fn is_poolable(self) -> bool {
        matches!(self, DataType::S32 | DataType::S8 | DataType::U8)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::F32 => "f32",
            DataType::S32 => "s32",
            DataType::S16 => "s16",
            DataType::S8 => "s8",
            DataType::U8 => "u8",
        };
        f.write_str(name)
    }
}

/// Pooling reduction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Per-channel maximum over the window.
    Max,
    /// Average whose divisor is always `kh * kw`; padded positions count as zero.
    AvgIncludePadding,
    /// Average whose divisor counts only positions inside the input.
    AvgExcludePadding,
}

impl Algorithm {
    /// True for both average variants.
    pub const fn is_average(self) -> bool {
        matches!(
            self,
            Algorithm::AvgIncludePadding | Algorithm::AvgExcludePadding
        )
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Max => "max",
            Algorithm::AvgIncludePadding => "avg_include_padding",
            Algorithm::AvgExcludePadding => "avg_exclude_padding",
        };
        f.write_str(name)
    }
}

impl FromStr for Algorithm {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Ok(Algorithm::Max),
            "avg" | "avg_include_padding" => Ok(Algorithm::AvgIncludePadding),
            "avg_exclude_padding" => Ok(Algorithm::AvgExcludePadding),
            _ => Err(PoolError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}
