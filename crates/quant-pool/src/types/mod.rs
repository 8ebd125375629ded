//! Element types and descriptors for quantized pooling.
//!
//! This module defines the vocabulary shared by the resolver, the routine
//! bodies and the execution driver.
//!
//! # Element Types
//!
//! Pooling operates on fixed-width integer tensors. Each element type has a
//! fixed data path:
//!
//! | Type | [`DataType`] | Max init | Average widening |
//! |------|--------------|----------|------------------|
//! | `i8` | `S8` | -128 | sign extend to i32 |
//! | `u8` | `U8` | 0 | zero extend to i32 |
//! | `i32` | `S32` | `i32::MIN` | none |
//!
//! The [`PoolElement`] trait carries these rules so the routine bodies never
//! branch on a runtime data type.
//!
//! # Descriptors
//!
//! - [`TensorDesc`]: logical `[n, c, h, w]` dims over a dense channels-last
//!   buffer, so the channels of one pixel are contiguous
//! - [`PoolingDesc`]: algorithm, kernel, strides and padding
//!
//! # Example
//!
//! ```rust
//! use quant_pool::types::{Algorithm, DataType, PoolingDesc, TensorDesc};
//!
//! let src = TensorDesc::new([1, 3, 4, 4], DataType::S8);
//! let pd = PoolingDesc::new(Algorithm::Max, [2, 2]).with_strides([2, 2]);
//!
//! assert_eq!(pd.output_dims(&src), [1, 3, 2, 2]);
//! ```

mod data_type;
mod desc;
mod element;

pub use data_type::{Algorithm, DataType};
pub use desc::{PoolingDesc, TensorDesc};
pub use element::PoolElement;
