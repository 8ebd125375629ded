//! SIMD-specialized pooling routines.
//!
//! This module provides the routine bodies for quantized pooling and the
//! build-time selection that maps a resolved configuration onto one of them.
//!
//! # Supported Variants
//!
//! | Variant | x86_64 | aarch64 | Vector Width |
//! |---------|--------|---------|--------------|
//! | [`IsaVariant::Narrow`] | SSE4.2 | NEON | 128-bit |
//! | [`IsaVariant::Wide`] | AVX2 | - | 256-bit |
//!
//! # Routine Selection
//!
//! Every combination of algorithm class, source type, destination type and
//! variant is compiled ahead of time:
//!
//! ```text
//! max:     {s8, u8, s32}            x {narrow, wide}  =  6 routines
//! average: {s8, u8, s32} -> {s8, u8, s32} x {narrow, wide} = 18 routines
//! ```
//!
//! [`PoolRoutine::emit`] picks one when a kernel is built. Nothing in the hot
//! loop branches on the data type or the algorithm.
//!
//! # Routine Design
//!
//! For average pooling with a 256-bit vector (8 x i32 lanes):
//!
//! ```text
//! for each block of 8 channels:
//!     acc[0..8] = 0
//!     for kh in 0..kh_range:
//!         for kw in 0..kw_range:
//!             acc += widen(src[kh][kw][block])   // sign/zero extend to i32
//!     dst[block] = saturate(round(f32(acc) * idivider))
//! for each remaining channel:
//!     same, one lane at a time
//! ```
//!
//! # Module Contents
//!
//! - [`detect`]: host capability detection ([`HostCaps`])
//! - [`dispatch`]: routine selection ([`PoolRoutine`])
//! - [`kernels`]: reduction strategies and the generic loop nest

mod detect;
pub mod dispatch;
pub mod kernels;

pub use detect::{host_caps, HostCaps, IsaCapability, IsaVariant};
pub use dispatch::{PoolRoutine, RoutineFn};
pub use kernels::{AvgReduce, MaxReduce, Reduction, RoutineShape};
