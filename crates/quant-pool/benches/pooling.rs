//! Benchmarks for quantized pooling.
//!
//! Compares:
//! - Max vs average pooling on s8 activations
//! - Narrow vs wide instruction sets
//! - Sequential vs rayon execution
//! - Compiled kernels vs the scalar reference

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quant_pool::reference::pool_reference;
use quant_pool::{
    host_caps, resolve_and_build_with, run_typed_with, Algorithm, CompiledKernel, DataType,
    DefaultParallel, IsaCapability, IsaVariant, KernelOptions, PoolingDesc, Sequential,
    TensorDesc,
};

/// Typical CNN pooling layer: 3x3 stride 2, padding 1.
fn layer(alg: Algorithm) -> PoolingDesc {
    PoolingDesc::new(alg, [3, 3])
        .with_strides([2, 2])
        .with_padding([1, 1])
}

fn build(pd: &PoolingDesc, src: &TensorDesc, dst_dt: DataType, opts: &KernelOptions) -> CompiledKernel {
    let dst = pd.dst_desc(src, dst_dt);
    resolve_and_build_with(pd, src, &dst, &host_caps(), opts).unwrap()
}

fn input(len: usize) -> Vec<i8> {
    (0..len).map(|i| ((i * 31) % 256) as u8 as i8).collect()
}

/// Benchmark max and average pooling across spatial sizes.
fn bench_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pooling_S8");
    group.sample_size(20);

    for size in [14usize, 28, 56, 112].iter() {
        let n = *size;
        let src = TensorDesc::new([1, 64, n, n], DataType::S8);
        let data = input(src.nelems());

        group.throughput(Throughput::Elements(src.nelems() as u64));

        for alg in [Algorithm::Max, Algorithm::AvgExcludePadding] {
            let pd = layer(alg);
            let kernel = build(&pd, &src, DataType::S8, &KernelOptions::default());
            let mut out = vec![0i8; kernel.dst_desc().nelems()];

            group.bench_with_input(BenchmarkId::new(alg.to_string(), n), &n, |bench, _| {
                bench.iter(|| {
                    run_typed_with(&kernel, black_box(&data), &mut out, &Sequential);
                    black_box(&out);
                });
            });
        }
    }

    group.finish();
}

/// Benchmark each available instruction set with every unroll factor.
fn bench_isa(c: &mut Criterion) {
    let caps = host_caps();
    let mut group = c.benchmark_group("Pooling_ISA");
    group.sample_size(20);

    let src = TensorDesc::new([1, 256, 56, 56], DataType::U8);
    let data: Vec<u8> = (0..src.nelems()).map(|i| (i % 251) as u8).collect();
    let pd = layer(Algorithm::AvgIncludePadding);

    group.throughput(Throughput::Elements(src.nelems() as u64));

    for isa in IsaVariant::ALL {
        if !caps.available(isa) {
            println!("{isa} not available, skipping");
            continue;
        }
        for unroll in 1..=4 {
            let opts = KernelOptions::new().with_isa(isa).with_unroll(unroll);
            let kernel = build(&pd, &src, DataType::U8, &opts);
            let mut out = vec![0u8; kernel.dst_desc().nelems()];

            group.bench_with_input(
                BenchmarkId::new(isa.to_string(), unroll),
                &unroll,
                |bench, _| {
                    bench.iter(|| {
                        run_typed_with(&kernel, black_box(&data), &mut out, &Sequential);
                        black_box(&out);
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark batch execution on one thread vs the default executor.
fn bench_executors(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pooling_Executor");
    group.sample_size(20);

    let src = TensorDesc::new([8, 128, 56, 56], DataType::S8);
    let data = input(src.nelems());
    let kernel = build(&layer(Algorithm::Max), &src, DataType::S8, &KernelOptions::default());
    let mut out = vec![0i8; kernel.dst_desc().nelems()];

    group.throughput(Throughput::Elements(src.nelems() as u64));

    group.bench_function("sequential", |bench| {
        bench.iter(|| {
            run_typed_with(&kernel, black_box(&data), &mut out, &Sequential);
            black_box(&out);
        });
    });

    group.bench_function("default", |bench| {
        bench.iter(|| {
            run_typed_with(&kernel, black_box(&data), &mut out, &DefaultParallel::default());
            black_box(&out);
        });
    });

    group.finish();
}

/// Benchmark the compiled kernel against the scalar reference.
fn bench_reference(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pooling_vs_Reference");
    group.sample_size(10);

    let dims = [1, 64, 28, 28];
    let src = TensorDesc::new(dims, DataType::S8);
    let data = input(src.nelems());
    let pd = layer(Algorithm::AvgIncludePadding);
    let kernel = build(&pd, &src, DataType::S8, &KernelOptions::default());
    let mut out = vec![0i8; kernel.dst_desc().nelems()];

    group.throughput(Throughput::Elements(src.nelems() as u64));

    group.bench_function("compiled", |bench| {
        bench.iter(|| {
            run_typed_with(&kernel, black_box(&data), &mut out, &Sequential);
            black_box(&out);
        });
    });

    group.bench_function("reference", |bench| {
        bench.iter(|| black_box(pool_reference::<i8, i8>(&pd, dims, black_box(&data))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_algorithms,
    bench_isa,
    bench_executors,
    bench_reference
);
criterion_main!(benches);
