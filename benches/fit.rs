use criterion::{black_box, criterion_group, criterion_main, Criterion};
use seird::prelude::*;
use seird::simulator::infected;

fn observed(days: usize) -> ndarray::Array1<f64> {
    let truth = Parameters::new(2.5, 0.2, 0.3, 0.02, 0.1);
    infected(&time_grid(days), &truth, 1e6, &SolverSettings::default())
        .expect("synthetic series")
}

/// One forward solve of all five compartments over a year
fn benchmark_simulation(c: &mut Criterion) {
    let grid = time_grid(365);
    let parameters = Parameters::new(2.5, 0.2, 0.3, 0.02, 0.1);
    let solver = SolverSettings::default();
    c.bench_function("simulate_365", |b| {
        b.iter(|| {
            let _ = seird::simulator::compartments(
                black_box(&grid),
                black_box(&parameters),
                black_box(1e6),
                &solver,
            );
        });
    });
}

/// Full fit of a 60 day synthetic series, with and without parallel Jacobians
fn benchmark_fit(c: &mut Criterion) {
    let series = observed(60);
    let grid = time_grid(60);
    let solver = SolverSettings::default();
    let parallel = FitSettings::default();
    let sequential = FitSettings {
        parallel: false,
        ..FitSettings::default()
    };

    c.bench_function("fit_60_parallel", |b| {
        b.iter(|| {
            let _ = fit(black_box(&series), &grid, 1e6, &parallel, &solver);
        });
    });
    c.bench_function("fit_60_sequential", |b| {
        b.iter(|| {
            let _ = fit(black_box(&series), &grid, 1e6, &sequential, &solver);
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .noise_threshold(0.10); // Performance changes less than 10% will be ignored
    targets = benchmark_simulation, benchmark_fit
}
criterion_main!(benches);
