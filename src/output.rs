use crate::corpus::RunResults;
use anyhow::anyhow;
use formatx::formatx;
use std::fmt::Debug;
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

/// Location key under which run results are written
pub const RESULTS_LOCATION_KEY: &str = "results";

pub trait Output: Debug {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write>;
    /// Whether this output can be considered a no-op and therefore that any code that only writes to the output can be skipped.
    fn is_noop(&self) -> bool {
        false
    }
}

/// Writes each location key to its own file in a directory, named by filling `{}` in a template
/// (e.g. `"{}.json"`).
#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
}

impl FileOutput {
    pub fn new(directory_path: PathBuf, file_template: String) -> Self {
        Self {
            directory_path,
            file_template,
        }
    }

    fn path_for_location_key(&self, location_key: &str) -> anyhow::Result<PathBuf> {
        let file_name = formatx!(&self.file_template, location_key).map_err(|err| {
            anyhow!(
                "Could not build a file name from template '{}': {err:?}",
                self.file_template
            )
        })?;

        Ok(self.directory_path.join(file_name))
    }
}

impl Output for FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        Ok(BufWriter::new(File::create(
            self.path_for_location_key(location_key)?,
        )?))
    }
}

impl Output for &FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        <FileOutput as Output>::writer_for_location_key(self, location_key)
    }
}

/// An output that goes to nowhere/ a "sink"/ /dev/null.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_location_key(&self, _location_key: &str) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// Serialise run results as pretty-printed JSON under [`RESULTS_LOCATION_KEY`].
pub fn write_results(output: &impl Output, results: &RunResults) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }

    debug!("Writing results to {RESULTS_LOCATION_KEY}");
    let mut writer = output.writer_for_location_key(RESULTS_LOCATION_KEY)?;
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::RunTotals;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::Value;
    use std::fs;

    #[fixture]
    fn results() -> RunResults {
        RunResults {
            timestep_array: vec![0., 1.],
            air_temperature: vec![19.5, 20.],
            hvac_power: vec![1200., 0.],
            converged: vec![true, true],
            iterations: vec![3, 2],
            totals: RunTotals {
                heating_kwh: 1.2,
                cooling_kwh: 0.,
                non_converged_steps: 0,
            },
            ..Default::default()
        }
    }

    #[rstest]
    fn should_write_results_as_json(results: RunResults) {
        let directory = std::env::temp_dir().join(format!("zonesim-output-{}", std::process::id()));
        fs::create_dir_all(&directory).unwrap();
        let output = FileOutput::new(directory.clone(), "{}.json".into());

        write_results(&output, &results).unwrap();

        let written: Value =
            serde_json::from_str(&fs::read_to_string(directory.join("results.json")).unwrap())
                .unwrap();
        assert_eq!(written["air_temperature"], serde_json::json!([19.5, 20.0]));
        assert_eq!(written["totals"]["heating_kwh"], serde_json::json!(1.2));

        fs::remove_dir_all(directory).unwrap();
    }

    #[rstest]
    fn sink_output_is_noop(results: RunResults) {
        assert!(SinkOutput.is_noop());
        assert!(write_results(&SinkOutput, &results).is_ok());
    }
}
