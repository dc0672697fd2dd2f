use std::{
    fmt::Write as _,
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use eos_core::{Ack, RunId, RunRecord, Sink, SinkError};

use crate::prelude::*;

/// One pretty-printed JSON file per run, named after the run id.
#[must_use]
pub struct JsonSink {
    output_dir: PathBuf,
}

impl JsonSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    /// Percent-encode everything but ASCII alphanumerics and `-_.`, so distinct ids never share
    /// a file.
    pub fn path(&self, run_id: &RunId) -> PathBuf {
        let mut file_name = String::with_capacity(run_id.as_str().len() + 5);
        for byte in run_id.as_str().bytes() {
            if byte.is_ascii_alphanumeric() || b"-_.".contains(&byte) {
                file_name.push(char::from(byte));
            } else {
                let _ = write!(file_name, "%{byte:02X}");
            }
        }
        file_name.push_str(".json");
        self.output_dir.join(file_name)
    }
}

impl Sink for JsonSink {
    #[instrument(skip_all, fields(run_id = %record.run_id()))]
    fn write(&mut self, record: &RunRecord) -> Result<Ack, SinkError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.path(record.run_id());
        let replaced = path.exists();
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, record)
            .map_err(|error| SinkError::Serialize(error.to_string()))?;
        writer.flush()?;
        info!(path = %path.display(), replaced, "written");
        Ok(Ack { run_id: record.run_id().clone(), n_points: record.n_points(), replaced })
    }
}
