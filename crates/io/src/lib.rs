#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use asqp_core::math::Scalar;
use asqp_core::options::Settings;
use asqp_core::problem::ProblemQP;
use asqp_core::solution::Solution;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// On-disk problem format: the QP data plus optional solver settings,
/// tagged so other kinds can be added without breaking old files.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JsonProblem {
    Qp {
        problem: ProblemQP<Scalar>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        settings: Option<Settings<Scalar>>,
    },
}

pub fn read_json_problem<P: AsRef<Path>>(path: P) -> Result<JsonProblem> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .with_context(|| format!("failed to read {:?}", path))?;

    match serde_json::from_str::<JsonProblem>(&contents) {
        Ok(problem) => Ok(problem),
        Err(parse_err) => {
            if serde_json::from_str::<Solution<Scalar>>(&contents).is_ok() {
                Err(anyhow!(
                    "JSON file contains a solver solution, but an asqp problem (with a 'kind' field) was expected."
                ))
            } else {
                Err(parse_err).context("failed to parse JSON problem")
            }
        }
    }
}

pub fn write_json_problem<P: AsRef<Path>>(path: P, problem: &JsonProblem) -> Result<()> {
    let file = File::create(path.as_ref())
        .with_context(|| format!("failed to create {:?}", path.as_ref()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, problem).context("failed to serialise problem")?;
    Ok(())
}

pub fn write_solution<P: AsRef<Path>>(path: P, solution: &Solution<Scalar>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parent directory {:?}", parent))?;
        }
    }

    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, solution).context("failed to serialise solution")?;
    writer
        .flush()
        .with_context(|| format!("failed to write solution into {:?}", path))?;
    Ok(())
}

pub fn read_mps_problem<P: AsRef<Path>>(_path: P) -> Result<()> {
    anyhow::bail!("MPS parsing is not yet implemented.");
}
