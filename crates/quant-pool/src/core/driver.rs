use crate::simd::PoolRoutine;
use crate::types::Algorithm;

use super::call::CallParams;
use super::config::PoolConfig;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Part of a pooling window that lies inside the unpadded input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First valid input row.
    pub ih: usize,
    /// First valid input column.
    pub iw: usize,
    pub kh_range: usize,
    pub kw_range: usize,
}

/// Clip the window of output pixel `(oh, ow)` against the input.
pub fn window_bounds(cfg: &PoolConfig, oh: usize, ow: usize) -> Window {
    let (ih, kh_range) = clip_axis(oh * cfg.stride_h, cfg.t_pad, cfg.kh, cfg.ih);
    let (iw, kw_range) = clip_axis(ow * cfg.stride_w, cfg.l_pad, cfg.kw, cfg.iw);
    Window {
        ih,
        iw,
        kh_range,
        kw_range,
    }
}

/// Returns `(input origin, valid kernel extent)` along one axis.
fn clip_axis(pos: usize, pad: usize, k: usize, extent: usize) -> (usize, usize) {
    let origin = pos.saturating_sub(pad);
    let k_start = pad.saturating_sub(pos);
    let k_end = k.min((extent + pad).saturating_sub(pos));
    (origin, k_end.saturating_sub(k_start))
}

/// Reciprocal of the averaging divisor for a clipped window.
pub fn inverse_divider(cfg: &PoolConfig, window: &Window) -> f32 {
    let count = match cfg.alg {
        Algorithm::AvgExcludePadding => window.kh_range * window.kw_range,
        Algorithm::AvgIncludePadding | Algorithm::Max => cfg.kh * cfg.kw,
    };
    1.0 / count as f32
}

/// Parallel iteration over a 3D index space.
///
/// Implementations may run `body` in any order and on any thread, but must
/// call it exactly once per index.
pub trait ParallelFor3d {
    fn for_each_3d(&self, dims: [usize; 3], body: &(dyn Fn(usize, usize, usize) + Sync));
}

/// Runs every index on the calling thread, in row-major order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl ParallelFor3d for Sequential {
    fn for_each_3d(&self, [d0, d1, d2]: [usize; 3], body: &(dyn Fn(usize, usize, usize) + Sync)) {
        for i in 0..d0 {
            for j in 0..d1 {
                for k in 0..d2 {
                    body(i, j, k);
                }
            }
        }
    }
}

/// Spreads the flattened index space over the rayon thread pool.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy, Default)]
pub struct RayonParallel;

#[cfg(feature = "parallel")]
impl ParallelFor3d for RayonParallel {
    fn for_each_3d(&self, [d0, d1, d2]: [usize; 3], body: &(dyn Fn(usize, usize, usize) + Sync)) {
        let plane = d1 * d2;
        (0..d0 * plane).into_par_iter().for_each(|idx| {
            let rem = idx % plane;
            body(idx / plane, rem / d2, rem % d2);
        });
    }
}

/// Executor used when none is given.
#[cfg(feature = "parallel")]
pub type DefaultParallel = RayonParallel;

/// Executor used when none is given.
#[cfg(not(feature = "parallel"))]
pub type DefaultParallel = Sequential;

#[derive(Clone, Copy)]
struct SrcPtr(*const u8);

#[derive(Clone, Copy)]
struct DstPtr(*mut u8);

// SAFETY: the source is only read. Each output pixel writes a disjoint
// `c`-element range of the destination.
unsafe impl Send for SrcPtr {}
unsafe impl Sync for SrcPtr {}
unsafe impl Send for DstPtr {}
unsafe impl Sync for DstPtr {}

impl SrcPtr {
    fn get(self) -> *const u8 {
        self.0
    }
}

impl DstPtr {
    fn get(self) -> *mut u8 {
        self.0
    }
}

/// Run `routine` for every output pixel of `cfg`.
///
/// Panics if the buffers do not match the configured tensor sizes.
pub fn execute(
    cfg: &PoolConfig,
    routine: &PoolRoutine,
    src: &[u8],
    dst: &mut [u8],
    exec: &dyn ParallelFor3d,
) {
    let src_d = cfg.src_desc();
    let dst_d = cfg.dst_desc();

    assert_eq!(
        src.len(),
        src_d.size_bytes(),
        "source buffer size mismatch: expected {} bytes, got {}",
        src_d.size_bytes(),
        src.len()
    );
    assert_eq!(
        dst.len(),
        dst_d.size_bytes(),
        "destination buffer size mismatch: expected {} bytes, got {}",
        dst_d.size_bytes(),
        dst.len()
    );

    let src_ptr = SrcPtr(src.as_ptr());
    let dst_ptr = DstPtr(dst.as_mut_ptr());
    let src_size = src_d.element_byte_size();
    let dst_size = dst_d.element_byte_size();

    exec.for_each_3d([cfg.mb, cfg.oh, cfg.ow], &|n, oh, ow| {
        let window = window_bounds(cfg, oh, ow);
        debug_assert!(window.kh_range > 0 && window.kw_range > 0);

        let src_off = src_d.offset(n, 0, window.ih, window.iw) * src_size;
        let dst_off = dst_d.offset(n, 0, oh, ow) * dst_size;

        // SAFETY: offsets come from validated descriptors whose sizes were
        // checked against the buffers above; the clipped window stays inside
        // the source and each (n, oh, ow) owns its destination pixel.
        unsafe {
            let p = CallParams {
                src: src_ptr.get().add(src_off),
                dst: dst_ptr.get().add(dst_off),
                kw_range: window.kw_range,
                kh_range: window.kh_range,
                idivider: inverse_divider(cfg, &window),
            };
            routine.call(&p);
        }
    });
}
