#![allow(clippy::too_many_arguments)]

pub mod core;
pub mod corpus;
pub mod errors;
pub mod external_conditions;
pub mod input;
pub mod output;
pub mod simulation_time;

#[macro_use]
extern crate is_close;

pub use crate::corpus::RunResults;
use crate::corpus::Corpus;
use crate::input::ingest;
use crate::output::{write_results, Output};
use std::io::Read;
use tracing::info;

/// Read a project from JSON, run it and write its results to `output`.
pub fn run_project(input: impl Read, output: impl Output) -> anyhow::Result<RunResults> {
    let input = ingest(input)?;
    let mut corpus = Corpus::from_inputs(input)?;
    info!(
        surfaces = corpus.zone().surfaces().len(),
        unknowns = corpus.zone().system_size(),
        "Zone built"
    );

    let results = corpus.run()?;
    write_results(&output, &results)?;

    Ok(results)
}
