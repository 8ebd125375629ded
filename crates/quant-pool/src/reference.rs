//! Scalar reference pooling.
//!
//! A direct transcription of the pooling definition: no blocking, no
//! unrolling, no clipping tricks. Every padded position is skipped by an
//! explicit bounds test. The compiled routines must match it bit for bit,
//! so the average path uses the same `f32` reciprocal scaling and
//! ties-to-even rounding.
//!
//! Intended for tests, benchmarks and auditing, not for throughput.

use crate::types::{Algorithm, PoolElement, PoolingDesc, TensorDesc};

/// Pool a channels-last `src` with logical dims `src_dims`.
///
/// Returns the destination in channels-last order with dims
/// `pd.output_dims(src)`.
pub fn pool_reference<S: PoolElement, D: PoolElement>(
    pd: &PoolingDesc,
    src_dims: [usize; 4],
    src: &[S],
) -> Vec<D> {
    let src_d = TensorDesc::new(src_dims, S::DATA_TYPE);
    let dst_d = pd.dst_desc(&src_d, D::DATA_TYPE);
    assert_eq!(src.len(), src_d.nelems(), "source length mismatch");

    let [mb, channels, ih, iw] = src_dims;
    let [_, _, oh, ow] = dst_d.dims();
    let [kh, kw] = pd.kernel;
    let [sh, sw] = pd.strides;
    let [pt, pl] = pd.padding_tl;

    let mut dst = vec![D::LOWEST; dst_d.nelems()];

    for n in 0..mb {
        for oy in 0..oh {
            for ox in 0..ow {
                for c in 0..channels {
                    let mut max = S::LOWEST;
                    let mut sum = 0i32;
                    let mut valid = 0usize;

                    for ky in 0..kh {
                        let y = (oy * sh + ky) as isize - pt as isize;
                        if y < 0 || y >= ih as isize {
                            continue;
                        }
                        for kx in 0..kw {
                            let x = (ox * sw + kx) as isize - pl as isize;
                            if x < 0 || x >= iw as isize {
                                continue;
                            }
                            let v = src[src_d.offset(n, c, y as usize, x as usize)];
                            max = max.max_lane(v);
                            sum = sum.wrapping_add(v.widen());
                            valid += 1;
                        }
                    }

                    let out = match pd.algorithm {
                        Algorithm::Max => D::saturate_from(max.widen()),
                        Algorithm::AvgIncludePadding => average(sum, kh * kw),
                        Algorithm::AvgExcludePadding => average(sum, valid),
                    };
                    dst[dst_d.offset(n, c, oy, ox)] = out;
                }
            }
        }
    }

    dst
}

fn average<D: PoolElement>(sum: i32, count: usize) -> D {
    let scaled = (sum as f32 * (1.0 / count as f32)).round_ties_even();
    D::saturate_from(scaled as i32)
}
