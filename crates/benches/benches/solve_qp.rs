use asqp_api::{QpBuilder, Settings, Solver};
use asqp_benches::{random_constraints, random_spd_matrix};
use asqp_core::math::Scalar;
use asqp_core::problem::ProblemQP;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn build_problem(n: usize, m: usize, rng: &mut SmallRng) -> ProblemQP<Scalar> {
    let q = random_spd_matrix(n, rng);
    let c = (0..n)
        .map(|_| rng.gen::<Scalar>() - 0.5)
        .collect::<Vec<_>>();
    let a = random_constraints(m, n, rng);
    let upper = (0..m)
        .map(|_| rng.gen::<Scalar>() + 0.5)
        .collect::<Vec<_>>();
    QpBuilder::new()
        .q(q)
        .c(c)
        .rows(a, vec![f64::NEG_INFINITY; m], upper)
        .bounds(vec![-1.0; n], vec![1.0; n])
        .build()
        .unwrap()
}

fn solve_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("active_set_qp_solve");
    for (n, m) in [(20, 10), (50, 30)] {
        let mut rng = SmallRng::seed_from_u64(42);
        group.bench_function(format!("n={n}_m={m}"), |b| {
            b.iter_batched(
                || build_problem(n, m, &mut rng),
                |problem| {
                    let solver = Solver::<Scalar>::new().settings(Settings::default());
                    let _ = solver.solve(&problem).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, solve_benchmark);
criterion_main!(benches);
