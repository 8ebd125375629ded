use std::fmt;

use once_cell::sync::OnceCell;

/// SIMD variant a pooling routine is specialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IsaVariant {
    /// 128-bit vectors (SSE4.2 on x86_64, NEON on aarch64).
    Narrow,
    /// 256-bit vectors (AVX2 on x86_64).
    Wide,
}

impl IsaVariant {
    /// Physical vector width in bytes.
    pub const fn vector_bytes(self) -> usize {
        match self {
            IsaVariant::Narrow => 16,
            IsaVariant::Wide => 32,
        }
    }

    /// Both variants, narrowest first.
    pub const ALL: [IsaVariant; 2] = [IsaVariant::Narrow, IsaVariant::Wide];
}

impl fmt::Display for IsaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsaVariant::Narrow => "narrow (128-bit)",
            IsaVariant::Wide => "wide (256-bit)",
        };
        f.write_str(name)
    }
}

/// Instruction-set capability query.
///
/// # Safety
///
/// Routines selected for a variant reported as available are compiled with
/// that variant's target features enabled. An implementation must never
/// report a variant the executing host cannot run.
pub unsafe trait IsaCapability {
    fn available(&self, variant: IsaVariant) -> bool;
}

/// Capabilities detected on the running host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCaps {
    narrow: bool,
    wide: bool,
}

impl HostCaps {
    /// Run feature detection.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Self {
                narrow: is_x86_feature_detected!("sse4.2"),
                wide: is_x86_feature_detected!("avx2"),
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            Self {
                narrow: std::arch::is_aarch64_feature_detected!("neon"),
                wide: false,
            }
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self {
                narrow: false,
                wide: false,
            }
        }
    }

    /// Mask a variant off. Capabilities can only be removed, never added.
    pub fn without(mut self, variant: IsaVariant) -> Self {
        match variant {
            IsaVariant::Narrow => self.narrow = false,
            IsaVariant::Wide => self.wide = false,
        }
        self
    }

    /// Widest available variant, if any.
    pub fn best(&self) -> Option<IsaVariant> {
        IsaVariant::ALL
            .iter()
            .rev()
            .copied()
            .find(|&v| self.available(v))
    }
}

// SAFETY: fields are only ever set from runtime detection or cleared.
unsafe impl IsaCapability for HostCaps {
    fn available(&self, variant: IsaVariant) -> bool {
        match variant {
            IsaVariant::Narrow => self.narrow,
            IsaVariant::Wide => self.wide,
        }
    }
}

static HOST_CAPS: OnceCell<HostCaps> = OnceCell::new();

/// Host capabilities, detected once per process.
pub fn host_caps() -> HostCaps {
    *HOST_CAPS.get_or_init(|| {
        let caps = HostCaps::detect();
        log::info!(
            "detected pooling instruction sets: narrow={}, wide={}",
            caps.narrow,
            caps.wide
        );
        caps
    })
}
