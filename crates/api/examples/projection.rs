use anyhow::Result;
use asqp_api::{QpBuilder, RecordingObserver, Settings, Solver};
use asqp_core::math::Scalar;
use asqp_core::problem::CscMatrix;

/// Projects a point onto the probability simplex and prints the
/// per-iteration trace.
fn main() -> Result<()> {
    let n = 4;
    let target = vec![0.9, 0.6, -0.3, 0.4];
    let problem = QpBuilder::new()
        .q(CscMatrix::identity(n))
        .c(target.iter().map(|t| -t).collect())
        .rows(ones_row(n), vec![1.0], vec![1.0])
        .bounds(vec![0.0; n], vec![f64::INFINITY; n])
        .build()?;

    let mut settings = Settings::default();
    settings.reporting_frequency = 1;
    let solver = Solver::<Scalar>::new().settings(settings).guess(target);
    let mut observer = RecordingObserver::default();
    let solution = solver.solve_observed(&problem, Some(&mut observer))?;

    for record in &observer.records {
        println!(
            "iter {:3}  nullspace {}  objective {:+.6}",
            record.iteration, record.nullspace_dimension, record.objective
        );
    }
    println!("status: {:?}", solution.status);
    println!("x: {:?}", solution.primal);
    Ok(())
}

fn ones_row(n: usize) -> CscMatrix<Scalar> {
    CscMatrix {
        nrows: 1,
        ncols: n,
        indptr: (0..=n).collect(),
        indices: vec![0; n],
        data: vec![1.0; n],
    }
}
