//! Kernel configuration and execution.
//!
//! This module turns descriptors into a resolved configuration and drives a
//! compiled routine over every output pixel.
//!
//! # Execution Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ PoolConfig::resolve(pd, src, dst)     (once per operator)       │
//! │ PoolRoutine::emit(config)             (once per operator)       │
//! │ parallel_for (n, oh, ow):                                        │
//! │   window = window_bounds(config, oh, ow)   clip against padding │
//! │   params = CallParams { src, dst, kh_range, kw_range, idivider } │
//! │   routine.call(params)                                           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Output pixels are independent: each reads a region of the shared,
//! read-only source and writes its own `c` destination elements, so the
//! driver needs no synchronization.
//!
//! # Blocking Parameters
//!
//! | Parameter | Meaning | Wide, s8 max |
//! |-----------|---------|--------------|
//! | `c_block` | channels per vector block | 32 |
//! | `nb_c` | full blocks | `c / 32` |
//! | `c_tail` | channels left for the scalar path | `c % 32` |
//! | `ur_c` | blocks per main-loop body | 1 |
//!
//! # Module Contents
//!
//! - [`config`](config): [`PoolConfig`] and the resolver
//! - [`options`](options): [`KernelOptions`], including environment overrides
//! - [`call`](call): the per-pixel [`CallParams`] record
//! - [`driver`](driver): window clipping and the [`ParallelFor3d`] executors

mod call;
mod config;
mod driver;
mod options;

pub use call::CallParams;
pub use config::{block_width, PoolConfig};
#[cfg(feature = "parallel")]
pub use driver::RayonParallel;
pub use driver::{
    execute, inverse_divider, window_bounds, DefaultParallel, ParallelFor3d, Sequential, Window,
};
pub use options::{IsaPreference, KernelOptions, ENV_ISA, ENV_UNROLL, MAX_UNROLL};
