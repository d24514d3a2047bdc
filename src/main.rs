use clap::Parser;
use rayon::prelude::*;
use std::ffi::OsStr;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use zonesim::output::FileOutput;
use zonesim::run_project;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct ZoneSimArgs {
    #[arg(required = true, help = "One or more project files in .json format")]
    input_files: Vec<String>,
    #[arg(long, default_value_t = tracing::Level::INFO, help = "Most verbose level to log")]
    log_level: tracing::Level,
}

fn main() -> anyhow::Result<()> {
    let args = ZoneSimArgs::parse();

    // set up basic tracing
    let tracing_subscriber = tracing_subscriber::fmt::fmt()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(tracing_subscriber)
        .expect("setting tracing subscriber failed");

    let failures = args
        .input_files
        .par_iter()
        .filter_map(|input_file| match run_file(input_file) {
            Ok(()) => None,
            Err(err) => {
                error!("{input_file}: {err:?}");
                Some(input_file.as_str())
            }
        })
        .collect::<Vec<_>>();

    if !failures.is_empty() {
        anyhow::bail!("{} of {} runs failed", failures.len(), args.input_files.len());
    }

    Ok(())
}

/// Run one project, writing results into a `<stem>__results` directory beside it.
fn run_file(input_file: &str) -> anyhow::Result<()> {
    let input_path = Path::new(input_file);
    let input_file_stem = input_path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(input_file);

    let output_path = input_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(format!("{input_file_stem}__results"));
    fs::create_dir_all(&output_path)?;

    let results = run_project(
        BufReader::new(File::open(input_path)?),
        FileOutput::new(output_path.clone(), "{}.json".into()),
    )?;

    info!(
        input = input_file,
        output = %output_path.display(),
        heating_kwh = results.totals.heating_kwh,
        cooling_kwh = results.totals.cooling_kwh,
        "Run complete"
    );

    Ok(())
}
