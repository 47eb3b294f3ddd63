use anyhow::Result;
use asqp_api::{QpBuilder, Settings, Solver};
use asqp_core::math::Scalar;
use asqp_core::problem::CscMatrix;

fn main() -> Result<()> {
    let q = diagonal(vec![2.0, 4.0, 6.0]);
    let c = vec![-2.0, -5.0, -3.0];
    let problem = QpBuilder::new()
        .q(q)
        .c(c)
        .bounds(vec![0.0, -1.0, 0.0], vec![1.0, 2.0, 4.0])
        .build()?;
    let solver = Solver::<Scalar>::new().settings(Settings::default());
    let solution = solver.solve(&problem)?;

    println!("status: {:?}", solution.status);
    println!("x: {:?}", solution.primal);
    println!("objective: {:.6}", solution.objective_value);
    Ok(())
}

fn diagonal(diag: Vec<Scalar>) -> CscMatrix<Scalar> {
    let n = diag.len();
    let mut indptr = Vec::with_capacity(n + 1);
    let mut indices = Vec::with_capacity(n);
    let mut data = Vec::with_capacity(n);
    indptr.push(0);
    for (idx, value) in diag.into_iter().enumerate() {
        indices.push(idx);
        data.push(value);
        indptr.push(indices.len());
    }
    CscMatrix {
        nrows: n,
        ncols: n,
        indptr,
        indices,
        data,
    }
}
