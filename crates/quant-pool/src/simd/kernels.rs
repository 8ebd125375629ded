//! Pooling routine bodies.
//!
//! One generic loop nest is instantiated per reduction strategy and block
//! width. The strategy fixes the data path (accumulator type, widening,
//! saturating narrow) at compile time, so the hot loop never branches on a
//! data type or algorithm. The block width `W` is a const generic and the
//! accumulators are fixed-size arrays, which the compiler keeps in vector
//! registers under the entry point's target features.

use std::marker::PhantomData;
use std::ptr;

use crate::core::{CallParams, MAX_UNROLL};
use crate::types::PoolElement;

/// Geometry baked into a routine at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineShape {
    /// Channel count; also the element stride between window columns.
    pub channels: usize,
    /// Element stride between window rows (`iw * c`).
    pub row_stride: usize,
    /// Blocks per main-loop body.
    pub unroll: usize,
}

/// Per-element data path of a pooling routine.
pub trait Reduction {
    type Src: PoolElement;
    type Dst: PoolElement;
    type Acc: Copy;

    /// Accumulator value before the first window element.
    const INIT: Self::Acc;

    fn accumulate(acc: Self::Acc, x: Self::Src) -> Self::Acc;

    fn finish(acc: Self::Acc, idivider: f32) -> Self::Dst;
}

/// Max pooling: accumulator has the source type, no widening.
pub struct MaxReduce<T>(PhantomData<T>);

impl<T: PoolElement> Reduction for MaxReduce<T> {
    type Src = T;
    type Dst = T;
    type Acc = T;

    const INIT: T = T::LOWEST;

    #[inline(always)]
    fn accumulate(acc: T, x: T) -> T {
        acc.max_lane(x)
    }

    #[inline(always)]
    fn finish(acc: T, _idivider: f32) -> T {
        acc
    }
}

/// Average pooling: widen into an i32 sum, scale in f32, narrow with saturation.
pub struct AvgReduce<S, D>(PhantomData<(S, D)>);

impl<S: PoolElement, D: PoolElement> Reduction for AvgReduce<S, D> {
    type Src = S;
    type Dst = D;
    type Acc = i32;

    const INIT: i32 = 0;

    #[inline(always)]
    fn accumulate(acc: i32, x: S) -> i32 {
        acc.wrapping_add(x.widen())
    }

    #[inline(always)]
    fn finish(acc: i32, idivider: f32) -> D {
        D::saturate_from(scale_round(acc, idivider))
    }
}

/// `round(acc * idivider)` with ties to even; out-of-range results saturate.
#[inline(always)]
pub fn scale_round(acc: i32, idivider: f32) -> i32 {
    (acc as f32 * idivider).round_ties_even() as i32
}

#[inline(always)]
unsafe fn load_block<T: Copy, const W: usize>(src: *const T) -> [T; W] {
    ptr::read_unaligned(src as *const [T; W])
}

#[inline(always)]
unsafe fn store_block<T: Copy, const W: usize>(dst: *mut T, v: [T; W]) {
    ptr::write_unaligned(dst as *mut [T; W], v)
}

/// Reduce `ur` consecutive blocks of `W` channels over the whole window.
#[inline(always)]
unsafe fn compute_step<R: Reduction, const W: usize>(
    shape: &RoutineShape,
    p: &CallParams,
    src: *const R::Src,
    dst: *mut R::Dst,
    ur: usize,
) {
    let mut acc = [[R::INIT; W]; MAX_UNROLL];

    let mut row = src;
    for _ in 0..p.kh_range {
        let mut col = row;
        for _ in 0..p.kw_range {
            for (jj, lanes) in acc.iter_mut().enumerate().take(ur) {
                let v = load_block::<R::Src, W>(col.add(jj * W));
                for (a, x) in lanes.iter_mut().zip(v) {
                    *a = R::accumulate(*a, x);
                }
            }
            col = col.add(shape.channels);
        }
        row = row.add(shape.row_stride);
    }

    for (jj, lanes) in acc.iter().enumerate().take(ur) {
        let mut out = [<R::Dst as PoolElement>::LOWEST; W];
        for (o, a) in out.iter_mut().zip(lanes) {
            *o = R::finish(*a, p.idivider);
        }
        store_block::<R::Dst, W>(dst.add(jj * W), out);
    }
}

/// Walk all channels: unrolled blocks, then single blocks, then the scalar tail.
#[inline(always)]
unsafe fn compute_c_block<R: Reduction, const W: usize>(shape: &RoutineShape, p: &CallParams) {
    let c = shape.channels;
    let ur = shape.unroll;

    let mut src = p.src as *const R::Src;
    let mut dst = p.dst as *mut R::Dst;
    let mut c_iter = 0;

    while c_iter + ur * W <= c {
        compute_step::<R, W>(shape, p, src, dst, ur);
        src = src.add(ur * W);
        dst = dst.add(ur * W);
        c_iter += ur * W;
    }

    while c_iter + W <= c {
        compute_step::<R, W>(shape, p, src, dst, 1);
        src = src.add(W);
        dst = dst.add(W);
        c_iter += W;
    }

    while c_iter < c {
        compute_step::<R, 1>(shape, p, src, dst, 1);
        src = src.add(1);
        dst = dst.add(1);
        c_iter += 1;
    }
}

/// Entry point for the 128-bit variant.
///
/// # Safety
/// The host must support the narrow variant, and `p` must describe a window
/// and destination valid for `shape`.
#[cfg_attr(target_arch = "x86_64", target_feature(enable = "sse4.2"))]
pub unsafe fn narrow_entry<R: Reduction, const W: usize>(shape: &RoutineShape, p: &CallParams) {
    compute_c_block::<R, W>(shape, p)
}

/// Entry point for the 256-bit variant.
///
/// # Safety
/// The host must support the wide variant, and `p` must describe a window
/// and destination valid for `shape`.
#[cfg_attr(target_arch = "x86_64", target_feature(enable = "avx2"))]
pub unsafe fn wide_entry<R: Reduction, const W: usize>(shape: &RoutineShape, p: &CallParams) {
    compute_c_block::<R, W>(shape, p)
}
