//! Quantized 2D pooling on channels-last integer tensors.
//!
//! This crate computes max and average pooling over `NHWC` tensors of
//! `s8`, `u8` and `s32` elements, using SIMD routines specialized per data
//! type, algorithm and instruction set. Routines are selected once, when a
//! kernel is built, so the hot loop never branches on configuration.
//!
//! # Quick Start
//!
//! ```
//! use quant_pool::{pool2d, Algorithm, PoolingDesc};
//!
//! // 1 image, 1 channel, 4x4, channels-last
//! let src: Vec<i8> = (1..=16).collect();
//! let pd = PoolingDesc::new(Algorithm::Max, [2, 2]).with_strides([2, 2]);
//!
//! let dst = pool2d::<i8, i8>(&pd, [1, 1, 4, 4], &src).unwrap();
//! assert_eq!(dst, vec![6, 8, 14, 16]);
//! ```
//!
//! # Persistent Kernels
//!
//! For repeated execution, build once and run many times:
//!
//! ```
//! use quant_pool::{resolve_and_build, run, Algorithm, DataType, PoolingDesc, TensorDesc};
//!
//! let src = TensorDesc::new([1, 64, 8, 8], DataType::U8);
//! let pd = PoolingDesc::new(Algorithm::AvgExcludePadding, [3, 3])
//!     .with_strides([2, 2])
//!     .with_padding([1, 1]);
//! let dst = pd.dst_desc(&src, DataType::S32);
//!
//! let kernel = resolve_and_build(&pd, &src, &dst).unwrap();
//!
//! let input = vec![7u8; src.size_bytes()];
//! let mut output = vec![0u8; dst.size_bytes()];
//! run(&kernel, &input, &mut output);
//! ```
//!
//! # Supported Combinations
//!
//! | Algorithm | Source | Destination |
//! |-----------|--------|-------------|
//! | max | s8, u8, s32 | same as source |
//! | average (include or exclude padding) | s8, u8, s32 | s8, u8, s32 |
//!
//! Averages accumulate in `i32`, scale by an `f32` reciprocal, round half
//! to even, and saturate into the destination type.
//!
//! # Instruction Sets
//!
//! | Variant | x86_64 | aarch64 |
//! |---------|--------|---------|
//! | Narrow (128-bit) | SSE4.2 | NEON |
//! | Wide (256-bit) | AVX2 | - |
//!
//! The widest available variant is used unless [`KernelOptions`] or the
//! `QPOOL_ISA` environment variable forces one.
//!
//! # Features
//!
//! - `parallel` (default): spread output pixels over the rayon thread pool

mod api;
pub mod core;
pub mod error;
pub mod reference;
pub mod simd;
pub mod types;

pub use api::{
    global_cache, pool2d, resolve_and_build, resolve_and_build_with, run, run_typed,
    run_typed_with, run_with, CompiledKernel, KernelCache, GLOBAL_CACHE_CAPACITY,
};
pub use crate::core::{
    DefaultParallel, IsaPreference, KernelOptions, ParallelFor3d, PoolConfig, Sequential,
};
#[cfg(feature = "parallel")]
pub use crate::core::RayonParallel;
pub use error::{PoolError, Result};
pub use simd::{host_caps, HostCaps, IsaCapability, IsaVariant};
pub use types::{Algorithm, DataType, PoolElement, PoolingDesc, TensorDesc};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::api::{pool2d, resolve_and_build, run, run_typed, CompiledKernel};
    pub use crate::core::KernelOptions;
    pub use crate::error::{PoolError, Result};
    pub use crate::types::{Algorithm, DataType, PoolElement, PoolingDesc, TensorDesc};
}
