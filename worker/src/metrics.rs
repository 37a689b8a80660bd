use std::{
    fs::{self, File},
    io::{self, LineWriter, Write},
    path::Path,
};

use log::warn;
use serde::Serialize;

/// The file every worker appends its scalars to.
pub const SCALARS_FILE: &str = "scalars.jsonl";

/// A named scalar at a step index.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub name: String,
    pub step: u64,
    pub value: f32,
}

/// Where a worker records its time series.
///
/// Recording never fails the training loop, sinks report their own failures.
pub trait MetricsSink {
    /// Records `value` under `name` at `step`.
    fn record(&mut self, name: &str, step: u64, value: f32);
}

impl MetricsSink for Vec<Scalar> {
    fn record(&mut self, name: &str, step: u64, value: f32) {
        self.push(Scalar {
            name: name.to_string(),
            step,
            value,
        });
    }
}

#[derive(Serialize)]
struct Record<'a> {
    name: &'a str,
    step: u64,
    value: f32,
}

/// Appends one JSON object per scalar to `<dir>/scalars.jsonl`.
pub struct JsonlSink {
    out: LineWriter<File>,
}

impl JsonlSink {
    /// Creates `dir` if needed and opens the scalars file inside it.
    pub fn create<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let file = File::options()
            .create(true)
            .append(true)
            .open(dir.join(SCALARS_FILE))?;

        Ok(Self {
            out: LineWriter::new(file),
        })
    }

    fn write(&mut self, record: &Record) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")
    }
}

impl MetricsSink for JsonlSink {
    fn record(&mut self, name: &str, step: u64, value: f32) {
        let record = Record { name, step, value };
        if let Err(e) = self.write(&record) {
            warn!(step = step; "failed to record {name}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, process};

    #[test]
    fn jsonl_sink_writes_one_object_per_line() {
        let dir = env::temp_dir().join(format!("a3c-metrics-{}", process::id()));
        let _ = fs::remove_dir_all(&dir);

        let mut sink = JsonlSink::create(&dir).unwrap();
        sink.record("worker_0/rl/value_loss", 100, 0.5);
        sink.record("worker_0/steps_per_second", 101, 250.);
        drop(sink);

        let contents = fs::read_to_string(dir.join(SCALARS_FILE)).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["name"], "worker_0/rl/value_loss");
        assert_eq!(lines[0]["step"], 100);
        assert_eq!(lines[1]["value"], 250.0);

        fs::remove_dir_all(&dir).unwrap();
    }
}
