//! Benchmarks for the slope engines

use adaslope_algorithms::paths::{evaluate_paths, PathEvalParams};
use adaslope_algorithms::terrain::{slope_field, summarize_raster, RasterSummaryParams, SlopeFieldParams};
use adaslope_core::{Feature, FeatureCollection, GeoTransform, Raster, CRS};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::{Geometry, LineString};

fn create_dem(size: usize) -> Raster<f64> {
    let mut dem = Raster::new(size, size);
    dem.set_transform(GeoTransform::new(500_000.0, 3_400_000.0 + size as f64, 1.0, -1.0));
    dem.set_crs(Some(CRS::nad83_utm17n()));

    // gentle ramp with a repeating bump pattern
    for row in 0..size {
        for col in 0..size {
            let base = (row + 2 * col) as f64 * 0.03;
            let variation = ((row * 7 + col * 13) % 100) as f64 / 200.0;
            dem.set(row, col, base + variation).unwrap();
        }
    }
    dem
}

/// Diagonal paths across the DEM, one every 8 m.
fn create_paths(size: usize) -> FeatureCollection {
    let top = 3_400_000.0 + size as f64;
    let features = (0..size / 8)
        .map(|i| {
            let offset = (i * 8) as f64;
            let line = LineString::from(vec![
                (500_000.5 + offset, top - 0.5),
                (500_000.0 + size as f64 - 0.5, 3_400_000.5 + offset),
            ]);
            Feature::new(Geometry::LineString(line))
        })
        .collect();
    FeatureCollection::with_features(Some(CRS::nad83_utm17n()), features)
}

fn bench_slope_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("slope_field");

    for size in [256, 512, 1024, 2048].iter() {
        let dem = create_dem(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| slope_field(black_box(&dem), &SlopeFieldParams::default()).unwrap())
        });
    }

    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize_raster");

    for size in [512, 1024].iter() {
        let field = slope_field(&create_dem(*size), &SlopeFieldParams::default()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| summarize_raster(black_box(&field), &RasterSummaryParams::default()).unwrap())
        });
    }

    group.finish();
}

fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_paths");

    for size in [256, 1024].iter() {
        let field = slope_field(&create_dem(*size), &SlopeFieldParams::default()).unwrap();
        let paths = create_paths(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| evaluate_paths(black_box(&paths), &field, &PathEvalParams::default()).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_slope_field, bench_summary, bench_paths);
criterion_main!(benches);
