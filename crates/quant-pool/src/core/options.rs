use std::env;
use std::str::FromStr;

use crate::error::{PoolError, Result};
use crate::simd::IsaVariant;

/// Largest supported unrolling factor.
pub const MAX_UNROLL: usize = 4;

/// Environment variable selecting the instruction-set variant.
pub const ENV_ISA: &str = "QPOOL_ISA";

/// Environment variable selecting the unrolling factor.
pub const ENV_UNROLL: &str = "QPOOL_UNROLL";

/// Which SIMD variant a kernel should be built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IsaPreference {
    /// Widest variant the host supports.
    #[default]
    Auto,
    /// Exactly this variant, or fail.
    Force(IsaVariant),
}

impl FromStr for IsaPreference {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(IsaPreference::Auto),
            "narrow" | "sse42" | "sse4.2" | "neon" => Ok(IsaPreference::Force(IsaVariant::Narrow)),
            "wide" | "avx2" => Ok(IsaPreference::Force(IsaVariant::Wide)),
            other => Err(PoolError::InvalidOption(format!(
                "{ENV_ISA}: unknown instruction set '{other}'"
            ))),
        }
    }
}

/// Tuning knobs for kernel construction.
///
/// Neither option changes results: the same input produces bit-identical
/// output under every ISA and unrolling factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelOptions {
    pub isa: IsaPreference,
    /// Channel blocks processed per loop body, in `1..=MAX_UNROLL`.
    pub unroll: usize,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            isa: IsaPreference::Auto,
            unroll: 1,
        }
    }
}

impl KernelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_isa(mut self, isa: IsaVariant) -> Self {
        self.isa = IsaPreference::Force(isa);
        self
    }

    pub fn with_unroll(mut self, unroll: usize) -> Self {
        self.unroll = unroll;
        self
    }

    /// Read `QPOOL_ISA` and `QPOOL_UNROLL`, falling back to defaults when unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut opts = Self::default();
        if let Some(isa) = lookup(ENV_ISA) {
            opts.isa = isa.parse()?;
        }
        if let Some(unroll) = lookup(ENV_UNROLL) {
            opts.unroll = unroll.trim().parse().map_err(|_| {
                PoolError::InvalidOption(format!("{ENV_UNROLL}: not a number: '{unroll}'"))
            })?;
        }
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_UNROLL).contains(&self.unroll) {
            return Err(PoolError::InvalidOption(format!(
                "unroll must be in 1..={MAX_UNROLL}, got {}",
                self.unroll
            )));
        }
        Ok(())
    }
}
