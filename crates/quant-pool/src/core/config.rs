use crate::error::{PoolError, Result};
use crate::simd::{IsaCapability, IsaVariant};
use crate::types::{Algorithm, DataType, PoolingDesc, TensorDesc};

use super::options::{IsaPreference, KernelOptions};

/// Resolved blocking and shape parameters for one pooling operator.
///
/// Produced once by [`PoolConfig::resolve`] and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolConfig {
    pub mb: usize,
    pub c: usize,
    pub ih: usize,
    pub iw: usize,
    pub oh: usize,
    pub ow: usize,

    pub stride_h: usize,
    pub stride_w: usize,
    pub kh: usize,
    pub kw: usize,
    pub t_pad: usize,
    pub l_pad: usize,

    pub alg: Algorithm,
    pub src_dt: DataType,
    pub dst_dt: DataType,
    pub isa: IsaVariant,

    /// Channels per vector block.
    pub c_block: usize,
    /// `c % c_block`
    pub c_tail: usize,
    /// `c / c_block`
    pub nb_c: usize,
    /// Blocks per main-loop body.
    pub ur_c: usize,
}

/// Channel-block width for an algorithm, source type and variant.
///
/// Max pooling keeps the source width, so a block fills the whole vector.
/// Average pooling accumulates in 32 bits, so a block is one 32-bit lane
/// per channel.
pub const fn block_width(alg: Algorithm, src_dt: DataType, isa: IsaVariant) -> usize {
    match alg {
        Algorithm::Max => isa.vector_bytes() / src_dt.size(),
        Algorithm::AvgIncludePadding | Algorithm::AvgExcludePadding => isa.vector_bytes() / 4,
    }
}

impl PoolConfig {
    /// Derive the configuration from the descriptors.
    ///
    /// Fails when the requested variant is unavailable, when the
    /// algorithm/type combination is unsupported, or when the descriptors
    /// disagree with each other.
    pub fn resolve(
        pd: &PoolingDesc,
        src: &TensorDesc,
        dst: &TensorDesc,
        caps: &dyn IsaCapability,
        opts: &KernelOptions,
    ) -> Result<Self> {
        let isa = select_isa(caps, opts.isa)?;
        check_data_types(pd.algorithm, src.data_type(), dst.data_type())?;
        check_shapes(pd, src, dst)?;
        opts.validate()?;

        let [mb, c, ih, iw] = src.dims();
        let [_, _, oh, ow] = dst.dims();

        let c_block = block_width(pd.algorithm, src.data_type(), isa);

        Ok(Self {
            mb,
            c,
            ih,
            iw,
            oh,
            ow,
            stride_h: pd.strides[0],
            stride_w: pd.strides[1],
            kh: pd.kernel[0],
            kw: pd.kernel[1],
            t_pad: pd.padding_tl[0],
            l_pad: pd.padding_tl[1],
            alg: pd.algorithm,
            src_dt: src.data_type(),
            dst_dt: dst.data_type(),
            isa,
            c_block,
            c_tail: c % c_block,
            nb_c: c / c_block,
            ur_c: opts.unroll,
        })
    }

    /// Source descriptor implied by this configuration.
    pub fn src_desc(&self) -> TensorDesc {
        TensorDesc::new([self.mb, self.c, self.ih, self.iw], self.src_dt)
    }

    pub fn dst_desc(&self) -> TensorDesc {
        TensorDesc::new([self.mb, self.c, self.oh, self.ow], self.dst_dt)
    }
}

fn select_isa(caps: &dyn IsaCapability, pref: IsaPreference) -> Result<IsaVariant> {
    match pref {
        IsaPreference::Force(v) if caps.available(v) => Ok(v),
        IsaPreference::Force(v) => Err(PoolError::UnsupportedInstructionSet(v)),
        IsaPreference::Auto => IsaVariant::ALL
            .iter()
            .rev()
            .copied()
            .find(|&v| caps.available(v))
            .ok_or(PoolError::NoInstructionSet),
    }
}

fn check_data_types(alg: Algorithm, src: DataType, dst: DataType) -> Result<()> {
    let supported = src.is_poolable()
        && dst.is_poolable()
        && match alg {
            Algorithm::Max => src == dst,
            Algorithm::AvgIncludePadding | Algorithm::AvgExcludePadding => true,
        };
    if supported {
        Ok(())
    } else {
        Err(PoolError::UnsupportedDataType {
            algorithm: alg,
            src,
            dst,
        })
    }
}

fn check_shapes(pd: &PoolingDesc, src: &TensorDesc, dst: &TensorDesc) -> Result<()> {
    let [n, c, ih, iw] = src.dims();
    let [dn, dc, oh, ow] = dst.dims();

    if n != dn || c != dc {
        return Err(PoolError::InvalidShape(format!(
            "batch/channels differ: src [{n}, {c}], dst [{dn}, {dc}]"
        )));
    }
    if c == 0 {
        return Err(PoolError::InvalidShape("channel count is zero".into()));
    }
    if ih == 0 || iw == 0 {
        return Err(PoolError::InvalidShape(format!(
            "source spatial dims [{ih}, {iw}] must be non-zero"
        )));
    }
    if pd.kernel.contains(&0) || pd.strides.contains(&0) {
        return Err(PoolError::InvalidShape(format!(
            "kernel {:?} and strides {:?} must be non-zero",
            pd.kernel, pd.strides
        )));
    }
    for axis in 0..2 {
        let k = pd.kernel[axis];
        if pd.padding_tl[axis] >= k || pd.padding_br[axis] >= k {
            return Err(PoolError::InvalidShape(format!(
                "padding tl {:?} br {:?} must be smaller than kernel {:?}",
                pd.padding_tl, pd.padding_br, pd.kernel
            )));
        }
    }

    let expected = pd.output_dims(src);
    if [oh, ow] != [expected[2], expected[3]] {
        return Err(PoolError::InvalidShape(format!(
            "dst spatial dims [{oh}, {ow}] do not match expected [{}, {}]",
            expected[2], expected[3]
        )));
    }
    Ok(())
}
