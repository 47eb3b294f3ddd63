#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use asqp_api::{PricingStrategy, RatiotestStrategy, Settings, Solver};
use asqp_core::math::Scalar;
use asqp_core::solution::Solution;
use asqp_io::{read_json_problem, write_solution, JsonProblem};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asqp")]
#[command(version, about = "Null-space active-set solver for convex quadratic programs")]
struct Cli {
    #[arg(long)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Solve {
        #[arg(long)]
        problem: PathBuf,
        #[arg(long, default_value = "devex")]
        pricing: PricingArg,
        #[arg(long, default_value = "twopass")]
        ratiotest: RatiotestArg,
        #[arg(long)]
        iteration_limit: Option<usize>,
        #[arg(long)]
        time_limit: Option<u64>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        log_json: bool,
    },
    Check {
        #[arg(long)]
        problem: PathBuf,
    },
    Bench {},
}

#[derive(Clone, Copy, ValueEnum)]
enum PricingArg {
    Dantzig,
    Devex,
    DevexHarris,
    SteepestEdge,
}

impl From<PricingArg> for PricingStrategy {
    fn from(arg: PricingArg) -> PricingStrategy {
        match arg {
            PricingArg::Dantzig => PricingStrategy::Dantzig,
            PricingArg::Devex => PricingStrategy::Devex,
            PricingArg::DevexHarris => PricingStrategy::DevexHarris,
            PricingArg::SteepestEdge => PricingStrategy::SteepestEdge,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RatiotestArg {
    Textbook,
    Twopass,
}

impl From<RatiotestArg> for RatiotestStrategy {
    fn from(arg: RatiotestArg) -> RatiotestStrategy {
        match arg {
            RatiotestArg::Textbook => RatiotestStrategy::Textbook,
            RatiotestArg::Twopass => RatiotestStrategy::Twopass,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.log_json)?;
    match cli.command {
        Commands::Solve {
            problem,
            pricing,
            ratiotest,
            iteration_limit,
            time_limit,
            output,
            log_json,
        } => solve_command(
            problem,
            pricing.into(),
            ratiotest.into(),
            iteration_limit,
            time_limit,
            output,
            log_json,
        ),
        Commands::Check { problem } => check_command(problem),
        Commands::Bench {} => {
            println!("Benchmarks are available via `cargo bench -p asqp-benches`.");
            Ok(())
        }
    }
}

fn initialize_tracing(log_json: bool) -> Result<()> {
    if log_json {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .try_init()
            .ok();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init()
            .ok();
    }
    Ok(())
}

fn solve_command(
    path: PathBuf,
    pricing: PricingStrategy,
    ratiotest: RatiotestStrategy,
    iteration_limit: Option<usize>,
    time_limit: Option<u64>,
    output: Option<PathBuf>,
    output_json: bool,
) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "json" => {
            let JsonProblem::Qp { problem, settings } = read_json_problem(&path)?;
            let mut settings = settings.unwrap_or_default();
            settings.pricing = pricing;
            settings.ratiotest = ratiotest;
            if let Some(iters) = iteration_limit {
                settings.iteration_limit = iters;
            }
            if let Some(limit) = time_limit {
                settings.time_limit = Some(Duration::from_secs(limit));
            }
            let solver = Solver::<Scalar>::new().settings(settings);
            let solution = solver.solve(&problem)?;
            emit_solution(solution, output, output_json)?;
        }
        "mps" => {
            anyhow::bail!("MPS parsing is not implemented yet.");
        }
        _ => {
            anyhow::bail!("Unsupported file extension: {}", extension);
        }
    }
    Ok(())
}

fn emit_solution(
    solution: Solution<Scalar>,
    output: Option<PathBuf>,
    output_json: bool,
) -> Result<()> {
    if output_json {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer_pretty(&mut handle, &solution)?;
        handle.write_all(b"\n")?;
        handle.flush()?;
    } else {
        println!(
            "status: {:?}\nobjective: {:.6}\niters: {}",
            solution.status, solution.objective_value, solution.iterations
        );
    }
    if let Some(path) = output {
        write_solution(path, &solution)?;
    }
    Ok(())
}

fn check_command(path: PathBuf) -> Result<()> {
    let JsonProblem::Qp { problem, .. } = read_json_problem(&path)?;
    problem.validate().context("QP validation failed")?;
    println!("QP validation succeeded.");
    Ok(())
}
