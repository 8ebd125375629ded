/// Invocation record for one output pixel.
///
/// Built on the driver's stack for every `(n, oh, ow)` and handed to the
/// compiled routine. `src` points at the first valid input element of the
/// window (channel 0), `dst` at channel 0 of the output pixel.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct CallParams {
    pub src: *const u8,
    pub dst: *mut u8,
    /// Number of kernel columns inside the unpadded input.
    pub kw_range: usize,
    /// Number of kernel rows inside the unpadded input.
    pub kh_range: usize,
    /// Reciprocal of the averaging divisor; unused by max pooling.
    pub idivider: f32,
}
