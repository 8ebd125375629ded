use super::{Algorithm, DataType};

/// Tensor descriptor over a dense channels-last buffer.
///
/// Dims are logical `[n, c, h, w]`; the physical order is `n, h, w, c`, so a
/// pixel's channels are contiguous and a pooling window row advances by
/// `c` elements per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorDesc {
    dims: [usize; 4],
    data_type: DataType,
}

impl TensorDesc {
    /// Create a descriptor from logical `[n, c, h, w]` dims.
    pub fn new(dims: [usize; 4], data_type: DataType) -> Self {
        Self { dims, data_type }
    }

    /// Logical dims `[n, c, h, w]`.
    pub fn dims(&self) -> [usize; 4] {
        self.dims
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn element_byte_size(&self) -> usize {
        self.data_type.size()
    }

    /// Linear element index of `(n, c, h, w)`.
    #[inline]
    pub fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        let [_, channels, height, width] = self.dims;
        ((n * height + h) * width + w) * channels + c
    }

    /// Total number of elements.
    pub fn nelems(&self) -> usize {
        self.dims.iter().product()
    }

    /// Total buffer size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.nelems() * self.element_byte_size()
    }
}

/// Pooling operation descriptor.
///
/// Padding is split into the leading (`top`, `left`) and trailing
/// (`bottom`, `right`) edges. Only the leading edge moves the window; the
/// trailing edge only affects the output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolingDesc {
    pub algorithm: Algorithm,
    /// `[kh, kw]`
    pub kernel: [usize; 2],
    /// `[sh, sw]`
    pub strides: [usize; 2],
    /// `[top, left]`
    pub padding_tl: [usize; 2],
    /// `[bottom, right]`
    pub padding_br: [usize; 2],
}

impl PoolingDesc {
    /// Create a descriptor with unit strides and no padding.
    pub fn new(algorithm: Algorithm, kernel: [usize; 2]) -> Self {
        Self {
            algorithm,
            kernel,
            strides: [1, 1],
            padding_tl: [0, 0],
            padding_br: [0, 0],
        }
    }

    pub fn with_strides(mut self, strides: [usize; 2]) -> Self {
        self.strides = strides;
        self
    }

    /// Symmetric padding on all edges: `[ph, pw]`.
    pub fn with_padding(mut self, padding: [usize; 2]) -> Self {
        self.padding_tl = padding;
        self.padding_br = padding;
        self
    }

    /// Asymmetric padding.
    pub fn with_asymmetric_padding(mut self, tl: [usize; 2], br: [usize; 2]) -> Self {
        self.padding_tl = tl;
        self.padding_br = br;
        self
    }

    /// Output dims for a given source: `o = (i + pad_lo + pad_hi - k) / s + 1`.
    ///
    /// A window that cannot fit at all yields a zero spatial extent.
    pub fn output_dims(&self, src: &TensorDesc) -> [usize; 4] {
        let [n, c, ih, iw] = src.dims();
        let out = |i: usize, k: usize, s: usize, lo: usize, hi: usize| {
            let padded = i + lo + hi;
            if padded < k || s == 0 {
                0
            } else {
                (padded - k) / s + 1
            }
        };
        [
            n,
            c,
            out(ih, self.kernel[0], self.strides[0], self.padding_tl[0], self.padding_br[0]),
            out(iw, self.kernel[1], self.strides[1], self.padding_tl[1], self.padding_br[1]),
        ]
    }

    /// Destination descriptor for a source and destination data type.
    pub fn dst_desc(&self, src: &TensorDesc, dst_type: DataType) -> TensorDesc {
        TensorDesc::new(self.output_dims(src), dst_type)
    }
}
