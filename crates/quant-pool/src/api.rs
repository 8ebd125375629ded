use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;

use crate::core::{execute, DefaultParallel, KernelOptions, ParallelFor3d, PoolConfig};
use crate::error::Result;
use crate::simd::{host_caps, IsaCapability, PoolRoutine};
use crate::types::{PoolElement, PoolingDesc, TensorDesc};

/// A resolved configuration together with its compiled routine.
///
/// Immutable once built; share it freely between threads.
#[derive(Debug, Clone, Copy)]
pub struct CompiledKernel {
    config: PoolConfig,
    routine: PoolRoutine,
}

impl CompiledKernel {
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn routine(&self) -> &PoolRoutine {
        &self.routine
    }

    /// Source descriptor the kernel expects.
    pub fn src_desc(&self) -> TensorDesc {
        self.config.src_desc()
    }

    /// Destination descriptor the kernel writes.
    pub fn dst_desc(&self) -> TensorDesc {
        self.config.dst_desc()
    }
}

/// Resolve the configuration and build the routine for the host.
///
/// Uses the process-wide host capabilities and default [`KernelOptions`].
///
/// # Example
///
/// ```
/// use quant_pool::{resolve_and_build, run, Algorithm, DataType, PoolingDesc, TensorDesc};
///
/// let src = TensorDesc::new([1, 1, 4, 4], DataType::S8);
/// let pd = PoolingDesc::new(Algorithm::Max, [2, 2]).with_strides([2, 2]);
/// let dst = pd.dst_desc(&src, DataType::S8);
///
/// let kernel = resolve_and_build(&pd, &src, &dst).unwrap();
///
/// let input: Vec<u8> = (1..=16).collect();
/// let mut output = vec![0u8; 4];
/// run(&kernel, &input, &mut output);
/// assert_eq!(output, vec![6, 8, 14, 16]);
/// ```
pub fn resolve_and_build(
    pd: &PoolingDesc,
    src: &TensorDesc,
    dst: &TensorDesc,
) -> Result<CompiledKernel> {
    resolve_and_build_with(pd, src, dst, &host_caps(), &KernelOptions::default())
}

/// Resolve and build against explicit capabilities and options.
pub fn resolve_and_build_with(
    pd: &PoolingDesc,
    src: &TensorDesc,
    dst: &TensorDesc,
    caps: &dyn IsaCapability,
    opts: &KernelOptions,
) -> Result<CompiledKernel> {
    let config = PoolConfig::resolve(pd, src, dst, caps, opts)?;
    let routine = PoolRoutine::emit(&config)?;

    log::debug!(
        "built {} pooling kernel: {} -> {}, isa={}, c={}, c_block={}, c_tail={}, ur_c={}",
        config.alg,
        config.src_dt,
        config.dst_dt,
        config.isa,
        config.c,
        config.c_block,
        config.c_tail,
        config.ur_c
    );

    Ok(CompiledKernel { config, routine })
}

/// Pool `src` into `dst` on the default executor.
///
/// Both buffers are raw channels-last bytes sized exactly to the kernel's
/// descriptors.
///
/// # Panics
/// If either buffer size differs from its descriptor.
pub fn run(kernel: &CompiledKernel, src: &[u8], dst: &mut [u8]) {
    run_with(kernel, src, dst, &DefaultParallel::default())
}

/// Pool `src` into `dst` with an explicit executor.
pub fn run_with(kernel: &CompiledKernel, src: &[u8], dst: &mut [u8], exec: &dyn ParallelFor3d) {
    let cfg = &kernel.config;
    log::trace!(
        "pooling {}x{}x{} output pixels, {} channels",
        cfg.mb,
        cfg.oh,
        cfg.ow,
        cfg.c
    );
    execute(cfg, &kernel.routine, src, dst, exec);
}

/// Pool a typed tensor through a kernel built for `S` and `D`.
///
/// # Panics
/// If the kernel's data types differ from `S`/`D`, or on a size mismatch.
pub fn run_typed<S: PoolElement, D: PoolElement>(kernel: &CompiledKernel, src: &[S], dst: &mut [D]) {
    run_typed_with(kernel, src, dst, &DefaultParallel::default())
}

/// [`run_typed`] with an explicit executor.
pub fn run_typed_with<S: PoolElement, D: PoolElement>(
    kernel: &CompiledKernel,
    src: &[S],
    dst: &mut [D],
    exec: &dyn ParallelFor3d,
) {
    assert_eq!(
        kernel.config.src_dt,
        S::DATA_TYPE,
        "kernel source type mismatch"
    );
    assert_eq!(
        kernel.config.dst_dt,
        D::DATA_TYPE,
        "kernel destination type mismatch"
    );

    // SAFETY: every PoolElement is a plain integer without padding bytes, so
    // viewing it as bytes is sound; the byte lengths cover exactly the slices.
    let src_bytes = unsafe {
        std::slice::from_raw_parts(src.as_ptr() as *const u8, std::mem::size_of_val(src))
    };
    let dst_bytes = unsafe {
        std::slice::from_raw_parts_mut(dst.as_mut_ptr() as *mut u8, std::mem::size_of_val(dst))
    };
    run_with(kernel, src_bytes, dst_bytes, exec);
}

/// One-shot typed pooling: build for the host, allocate, run.
///
/// `src_dims` are logical `[n, c, h, w]` over channels-last `src`. Kernels
/// come from [`global_cache`], so repeated calls with the same shapes skip
/// the build. That cache holds at most [`GLOBAL_CACHE_CAPACITY`] kernels.
///
/// # Example
///
/// ```
/// use quant_pool::{pool2d, Algorithm, PoolingDesc};
///
/// let src: Vec<i8> = (1..=16).collect(); // 1x1x4x4
/// let pd = PoolingDesc::new(Algorithm::AvgIncludePadding, [3, 3]).with_padding([1, 1]);
///
/// let out = pool2d::<i8, i8>(&pd, [1, 1, 4, 4], &src).unwrap();
/// assert_eq!(out.len(), 16);
/// assert_eq!(out[0], 2); // (1 + 2 + 5 + 6) / 9
/// ```
pub fn pool2d<S: PoolElement, D: PoolElement>(
    pd: &PoolingDesc,
    src_dims: [usize; 4],
    src: &[S],
) -> Result<Vec<D>> {
    let src_d = TensorDesc::new(src_dims, S::DATA_TYPE);
    let dst_d = pd.dst_desc(&src_d, D::DATA_TYPE);
    let kernel = global_cache().get_or_build(pd, &src_d, &dst_d, &KernelOptions::default())?;

    let mut dst = vec![D::LOWEST; dst_d.nelems()];
    run_typed(&kernel, src, &mut dst);
    Ok(dst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    pd: PoolingDesc,
    src: TensorDesc,
    dst: TensorDesc,
    opts: KernelOptions,
}

/// Thread-safe cache of compiled kernels keyed by descriptors and options.
///
/// Resolution is deterministic, so a kernel built once for a key is valid
/// for every later request with the same key. Kernels are built against the
/// host capabilities.
///
/// An unbounded cache (from [`KernelCache::new`]) grows by one entry per
/// distinct key and never evicts. [`KernelCache::bounded`] caps the entry
/// count; at the cap an arbitrary entry is dropped before inserting.
/// Dropped kernels stay valid for callers still holding their `Arc`.
#[derive(Debug, Default)]
pub struct KernelCache {
    kernels: Mutex<HashMap<CacheKey, Arc<CompiledKernel>>>,
    capacity: Option<usize>,
}

impl KernelCache {
    /// Unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` kernels (at least one).
    pub fn bounded(capacity: usize) -> Self {
        Self {
            kernels: Mutex::default(),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Return the cached kernel for this key, building it on first use.
    ///
    /// Build errors are returned and not cached.
    pub fn get_or_build(
        &self,
        pd: &PoolingDesc,
        src: &TensorDesc,
        dst: &TensorDesc,
        opts: &KernelOptions,
    ) -> Result<Arc<CompiledKernel>> {
        let key = CacheKey {
            pd: *pd,
            src: *src,
            dst: *dst,
            opts: *opts,
        };

        if let Some(kernel) = self.lock().get(&key) {
            return Ok(Arc::clone(kernel));
        }

        // Built without the lock held; a racing builder for the same key may
        // win, in which case its kernel is returned and this one dropped.
        let built = Arc::new(resolve_and_build_with(pd, src, dst, &host_caps(), opts)?);

        let mut kernels = self.lock();
        if let Some(kernel) = kernels.get(&key) {
            return Ok(Arc::clone(kernel));
        }
        if let Some(cap) = self.capacity {
            if kernels.len() >= cap {
                if let Some(victim) = kernels.keys().next().copied() {
                    kernels.remove(&victim);
                }
            }
        }
        kernels.insert(key, Arc::clone(&built));
        log::debug!("kernel cache miss, {} entries cached", kernels.len());
        Ok(built)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<CompiledKernel>>> {
        self.kernels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Entry cap of [`global_cache`].
pub const GLOBAL_CACHE_CAPACITY: usize = 256;

static GLOBAL_CACHE: Lazy<KernelCache> = Lazy::new(|| KernelCache::bounded(GLOBAL_CACHE_CAPACITY));

/// Process-wide kernel cache used by [`pool2d`], bounded to
/// [`GLOBAL_CACHE_CAPACITY`] entries.
pub fn global_cache() -> &'static KernelCache {
    &GLOBAL_CACHE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sequential;
    use crate::error::PoolError;
    use crate::simd::{HostCaps, IsaVariant};
    use crate::types::{Algorithm, DataType};

    fn grid_4x4() -> Vec<i8> {
        (1..=16).collect()
    }

    #[test]
    fn test_max_pool_example() {
        let pd = PoolingDesc::new(Algorithm::Max, [2, 2]).with_strides([2, 2]);
        let out = pool2d::<i8, i8>(&pd, [1, 1, 4, 4], &grid_4x4()).unwrap();
        assert_eq!(out, vec![6, 8, 14, 16]);
    }

    #[test]
    fn test_avg_include_padding_example() {
        let pd = PoolingDesc::new(Algorithm::AvgIncludePadding, [3, 3]).with_padding([1, 1]);
        let out = pool2d::<i8, i8>(&pd, [1, 1, 4, 4], &grid_4x4()).unwrap();
        // (1 + 2 + 5 + 6) / 9 = 1.56
        assert_eq!(out[0], 2);
    }

    #[test]
    fn test_avg_exclude_padding_corner() {
        let pd = PoolingDesc::new(Algorithm::AvgExcludePadding, [3, 3]).with_padding([1, 1]);
        let out = pool2d::<i8, i32>(&pd, [1, 1, 4, 4], &grid_4x4()).unwrap();
        // (1 + 2 + 5 + 6) / 4 = 3.5, ties to even
        assert_eq!(out[0], 4);
        // centre window (1, 1): 1..=11 minus 4, 8 -> 54 / 9 = 6
        assert_eq!(out[5], 6);
    }

    #[test]
    fn test_max_u8_above_i8_range() {
        let src: Vec<u8> = vec![10, 200, 130, 255, 0, 129];
        let pd = PoolingDesc::new(Algorithm::Max, [1, 3]);
        // 2 channels, 1x3 spatial
        let out = pool2d::<u8, u8>(&pd, [1, 2, 1, 3], &src).unwrap();
        assert_eq!(out, vec![130, 255]);
    }

    #[test]
    fn test_max_s32_negative() {
        let src: Vec<i32> = vec![-7, -3, i32::MIN, -100];
        let pd = PoolingDesc::new(Algorithm::Max, [2, 2]);
        let out = pool2d::<i32, i32>(&pd, [1, 1, 2, 2], &src).unwrap();
        assert_eq!(out, vec![-3]);
    }

    #[test]
    fn test_avg_saturates_s32_to_s8() {
        let src = vec![1000i32; 4];
        let pd = PoolingDesc::new(Algorithm::AvgIncludePadding, [2, 2]);
        let out = pool2d::<i32, i8>(&pd, [1, 1, 2, 2], &src).unwrap();
        assert_eq!(out, vec![127]);

        let src = vec![-1000i32; 4];
        let out = pool2d::<i32, i8>(&pd, [1, 1, 2, 2], &src).unwrap();
        assert_eq!(out, vec![-128]);

        let out = pool2d::<i32, u8>(&pd, [1, 1, 2, 2], &src).unwrap();
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn test_run_with_sequential() {
        let src = TensorDesc::new([1, 1, 4, 4], DataType::S8);
        let pd = PoolingDesc::new(Algorithm::Max, [2, 2]).with_strides([2, 2]);
        let dst = pd.dst_desc(&src, DataType::S8);
        let kernel = resolve_and_build(&pd, &src, &dst).unwrap();

        let mut out = vec![0i8; 4];
        run_typed_with(&kernel, &grid_4x4(), &mut out, &Sequential);
        assert_eq!(out, vec![6, 8, 14, 16]);
    }

    #[test]
    #[should_panic(expected = "source buffer size mismatch")]
    fn test_run_rejects_short_source() {
        let src = TensorDesc::new([1, 1, 4, 4], DataType::S8);
        let pd = PoolingDesc::new(Algorithm::Max, [2, 2]);
        let dst = pd.dst_desc(&src, DataType::S8);
        let kernel = resolve_and_build(&pd, &src, &dst).unwrap();

        let mut out = vec![0u8; dst.size_bytes()];
        run(&kernel, &[0u8; 15], &mut out);
    }

    #[test]
    #[should_panic(expected = "kernel destination type mismatch")]
    fn test_run_typed_rejects_wrong_type() {
        let src = TensorDesc::new([1, 1, 2, 2], DataType::S8);
        let pd = PoolingDesc::new(Algorithm::AvgIncludePadding, [2, 2]);
        let dst = pd.dst_desc(&src, DataType::S32);
        let kernel = resolve_and_build(&pd, &src, &dst).unwrap();

        let mut out = vec![0u8; 1];
        run_typed(&kernel, &[1i8, 2, 3, 4], &mut out);
    }

    #[test]
    fn test_build_reports_errors() {
        let src = TensorDesc::new([1, 4, 4, 4], DataType::F32);
        let pd = PoolingDesc::new(Algorithm::Max, [2, 2]);
        let dst = pd.dst_desc(&src, DataType::F32);
        let err = resolve_and_build(&pd, &src, &dst).unwrap_err();
        assert!(matches!(err, PoolError::UnsupportedDataType { .. }));

        let src = TensorDesc::new([1, 4, 4, 4], DataType::S8);
        let dst = pd.dst_desc(&src, DataType::S8);
        let caps = HostCaps::detect().without(IsaVariant::Wide);
        let opts = KernelOptions::new().with_isa(IsaVariant::Wide);
        let err = resolve_and_build_with(&pd, &src, &dst, &caps, &opts).unwrap_err();
        assert_eq!(err, PoolError::UnsupportedInstructionSet(IsaVariant::Wide));
    }

    #[test]
    fn test_kernel_exposes_descriptors() {
        let src = TensorDesc::new([2, 40, 9, 9], DataType::U8);
        let pd = PoolingDesc::new(Algorithm::AvgExcludePadding, [3, 3])
            .with_strides([2, 2])
            .with_padding([1, 1]);
        let dst = pd.dst_desc(&src, DataType::S8);
        let kernel = resolve_and_build(&pd, &src, &dst).unwrap();

        assert_eq!(kernel.src_desc(), src);
        assert_eq!(kernel.dst_desc(), dst);
        assert_eq!(kernel.routine().block(), kernel.config().c_block);
        assert_eq!(kernel.routine().isa(), kernel.config().isa);
    }

    #[test]
    fn test_kernel_cache_reuses_kernels() {
        let cache = KernelCache::new();
        let src = TensorDesc::new([1, 16, 8, 8], DataType::S8);
        let pd = PoolingDesc::new(Algorithm::Max, [2, 2]).with_strides([2, 2]);
        let dst = pd.dst_desc(&src, DataType::S8);
        let opts = KernelOptions::default();

        let a = cache.get_or_build(&pd, &src, &dst, &opts).unwrap();
        let b = cache.get_or_build(&pd, &src, &dst, &opts).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let unrolled = opts.with_unroll(2);
        let c = cache.get_or_build(&pd, &src, &dst, &unrolled).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_kernel_cache_does_not_cache_errors() {
        let cache = KernelCache::new();
        let src = TensorDesc::new([1, 16, 8, 8], DataType::S8);
        let pd = PoolingDesc::new(Algorithm::Max, [2, 2]);
        let dst = pd.dst_desc(&src, DataType::U8);

        assert!(cache
            .get_or_build(&pd, &src, &dst, &KernelOptions::default())
            .is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_bounded_cache_evicts_at_capacity() {
        let cache = KernelCache::bounded(2);
        assert_eq!(cache.capacity(), Some(2));
        let pd = PoolingDesc::new(Algorithm::Max, [2, 2]);
        let opts = KernelOptions::default();

        let mut last = None;
        for c in [8, 16, 24] {
            let src = TensorDesc::new([1, c, 4, 4], DataType::S8);
            let dst = pd.dst_desc(&src, DataType::S8);
            last = Some((src, dst, cache.get_or_build(&pd, &src, &dst, &opts).unwrap()));
            assert!(cache.len() <= 2);
        }
        assert_eq!(cache.len(), 2);

        // the newest entry always survives its own insertion
        let (src, dst, kernel) = last.unwrap();
        let again = cache.get_or_build(&pd, &src, &dst, &opts).unwrap();
        assert!(Arc::ptr_eq(&kernel, &again));
        assert_eq!(kernel.config().c, 24);
    }

    #[test]
    fn test_global_cache_is_bounded() {
        assert_eq!(global_cache().capacity(), Some(GLOBAL_CACHE_CAPACITY));
    }

    #[test]
    fn test_concurrent_builds_share_one_kernel() {
        let cache = KernelCache::new();
        let src = TensorDesc::new([2, 40, 9, 9], DataType::U8);
        let pd = PoolingDesc::new(Algorithm::AvgIncludePadding, [3, 3]).with_padding([1, 1]);
        let dst = pd.dst_desc(&src, DataType::S32);
        let opts = KernelOptions::default();

        let kernels: Vec<Arc<CompiledKernel>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| cache.get_or_build(&pd, &src, &dst, &opts).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let cached = cache.get_or_build(&pd, &src, &dst, &opts).unwrap();
        assert!(kernels.iter().all(|k| Arc::ptr_eq(k, &cached)));
        assert_eq!(cache.len(), 1);
    }
}
