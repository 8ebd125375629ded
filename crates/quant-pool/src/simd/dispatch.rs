//! Build-time routine selection.
//!
//! [`PoolRoutine::emit`] maps a resolved [`PoolConfig`] onto one of the
//! precompiled routine instantiations. The selection runs once per kernel;
//! afterwards the routine is a plain function pointer plus its baked
//! geometry.

use std::fmt;

use crate::core::{CallParams, PoolConfig};
use crate::error::{PoolError, Result};
use crate::types::{Algorithm, DataType};

use super::kernels::{narrow_entry, wide_entry, AvgReduce, MaxReduce, RoutineShape};
use super::IsaVariant;

/// Signature shared by every routine instantiation.
pub type RoutineFn = unsafe fn(&RoutineShape, &CallParams);

const NARROW: usize = IsaVariant::Narrow.vector_bytes();
const WIDE: usize = IsaVariant::Wide.vector_bytes();

/// Pick the narrow or wide entry of a strategy with its block width.
macro_rules! entry_for {
    ($isa:expr, $reduce:ty, $lane_bytes:expr) => {
        match $isa {
            IsaVariant::Narrow => (
                narrow_entry::<$reduce, { NARROW / $lane_bytes }> as RoutineFn,
                NARROW / $lane_bytes,
            ),
            IsaVariant::Wide => (
                wide_entry::<$reduce, { WIDE / $lane_bytes }> as RoutineFn,
                WIDE / $lane_bytes,
            ),
        }
    };
}

/// A compiled pooling routine.
///
/// Stateless and reentrant: every call works only on its [`CallParams`] and
/// locals, so one routine may be invoked concurrently from many threads.
#[derive(Clone, Copy)]
pub struct PoolRoutine {
    entry: RoutineFn,
    shape: RoutineShape,
    block: usize,
    isa: IsaVariant,
}

impl PoolRoutine {
    /// Select the instantiation matching `cfg`.
    pub fn emit(cfg: &PoolConfig) -> Result<Self> {
        let (entry, block) = select(cfg.alg, cfg.src_dt, cfg.dst_dt, cfg.isa)?;
        debug_assert_eq!(block, cfg.c_block);

        Ok(Self {
            entry,
            shape: RoutineShape {
                channels: cfg.c,
                row_stride: cfg.iw * cfg.c,
                unroll: cfg.ur_c,
            },
            block,
            isa: cfg.isa,
        })
    }

    /// Run the routine for one output pixel.
    ///
    /// # Safety
    /// `p.src` must address a `kh_range x kw_range` window laid out with this
    /// routine's channel and row strides, `p.dst` must address `channels`
    /// writable destination elements, and nothing else may write them
    /// concurrently.
    #[inline]
    pub unsafe fn call(&self, p: &CallParams) {
        (self.entry)(&self.shape, p)
    }

    /// Channels per vector block of the selected instantiation.
    pub fn block(&self) -> usize {
        self.block
    }

    pub fn isa(&self) -> IsaVariant {
        self.isa
    }
}

impl fmt::Debug for PoolRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRoutine")
            .field("shape", &self.shape)
            .field("block", &self.block)
            .field("isa", &self.isa)
            .finish_non_exhaustive()
    }
}

fn select(
    alg: Algorithm,
    src: DataType,
    dst: DataType,
    isa: IsaVariant,
) -> Result<(RoutineFn, usize)> {
    use DataType::{S32, S8, U8};

    let routine = match alg {
        Algorithm::Max => match (src, dst) {
            (S8, S8) => entry_for!(isa, MaxReduce<i8>, 1),
            (U8, U8) => entry_for!(isa, MaxReduce<u8>, 1),
            (S32, S32) => entry_for!(isa, MaxReduce<i32>, 4),
            _ => return Err(unsupported(alg, src, dst)),
        },
        Algorithm::AvgIncludePadding | Algorithm::AvgExcludePadding => match (src, dst) {
            (S8, S8) => entry_for!(isa, AvgReduce<i8, i8>, 4),
            (S8, U8) => entry_for!(isa, AvgReduce<i8, u8>, 4),
            (S8, S32) => entry_for!(isa, AvgReduce<i8, i32>, 4),
            (U8, S8) => entry_for!(isa, AvgReduce<u8, i8>, 4),
            (U8, U8) => entry_for!(isa, AvgReduce<u8, u8>, 4),
            (U8, S32) => entry_for!(isa, AvgReduce<u8, i32>, 4),
            (S32, S8) => entry_for!(isa, AvgReduce<i32, i8>, 4),
            (S32, U8) => entry_for!(isa, AvgReduce<i32, u8>, 4),
            (S32, S32) => entry_for!(isa, AvgReduce<i32, i32>, 4),
            _ => return Err(unsupported(alg, src, dst)),
        },
    };
    Ok(routine)
}

fn unsupported(algorithm: Algorithm, src: DataType, dst: DataType) -> PoolError {
    PoolError::UnsupportedDataType {
        algorithm,
        src,
        dst,
    }
}
