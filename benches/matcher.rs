use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use frame_bridge::config::TargetSize;
use frame_bridge::matcher::{normalize, FrameMatcher, Ssim, SsimPlane};
use frame_bridge::video::{Frame, MemoryVideo};

fn textured(width: u32, height: u32, phase: u32) -> Frame {
    Frame::from_fn(width, height, |x, y| {
        let v = ((x * 7 + y * 3 + phase * 11) % 256) as u8;
        [v, 255 - v, v / 2]
    })
}

fn bench_ssim(c: &mut Criterion) {
    let mut group = c.benchmark_group("ssim");
    for &(width, height) in &[(160u32, 90u32), (640, 360), (1280, 720)] {
        let a = SsimPlane::new(&normalize(&textured(width, height, 0), (width, height)).unwrap()).unwrap();
        let b = SsimPlane::new(&normalize(&textured(width, height, 1), (width, height)).unwrap()).unwrap();
        let ssim = Ssim::default();

        group.bench_with_input(BenchmarkId::from_parameter(format!("{}x{}", width, height)), &(a, b), |bench, (a, b)| {
            bench.iter(|| ssim.compare(black_box(a), black_box(b)).unwrap())
        });
    }
    group.finish();
}

fn bench_find_best_connection(c: &mut Criterion) {
    let first = MemoryVideo::new((0..30).map(|p| textured(320, 180, p)).collect(), 30.0);
    let second = MemoryVideo::new((20..50).map(|p| textured(320, 180, p)).collect(), 30.0);

    let mut group = c.benchmark_group("find_best_connection");
    group.sample_size(10);
    for &window in &[5usize, 10, 20] {
        for parallel in [false, true] {
            let matcher = FrameMatcher::new(window, TargetSize::SmallestSource).with_parallel(parallel);
            let id = format!("window{}_{}", window, if parallel { "parallel" } else { "sequential" });
            group.bench_function(id, |bench| {
                bench.iter(|| matcher.find_best_connection(black_box(&first), black_box(&second)).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_ssim, bench_find_best_connection);
criterion_main!(benches);
