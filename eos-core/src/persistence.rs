use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    metrics::{MetricsExporter, RunMetrics},
    record::{RunId, RunRecord},
};

/// Acknowledgement of a stored run.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub run_id: RunId,
    pub n_points: usize,

    /// An earlier record of the same run has been overwritten.
    pub replaced: bool,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize the record: {0}")]
    Serialize(String),

    #[error("the store rejected the write with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to reach the store: {0}")]
    Transport(String),
}

/// Time-series store for run records.
///
/// Writes are idempotent by run id: writing the same run again replaces the earlier record.
pub trait Sink {
    fn write(&mut self, record: &RunRecord) -> Result<Ack, SinkError>;
}

/// Keyed in-memory store.
#[derive(Default)]
pub struct MemorySink(BTreeMap<RunId, RunRecord>);

impl MemorySink {
    #[must_use]
    pub fn get(&self, run_id: &RunId) -> Option<&RunRecord> {
        self.0.get(run_id)
    }

    pub fn delete(&mut self, run_id: &RunId) -> Option<RunRecord> {
        self.0.remove(run_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Sink for MemorySink {
    fn write(&mut self, record: &RunRecord) -> Result<Ack, SinkError> {
        let replaced = self.0.insert(record.run_id().clone(), record.clone()).is_some();
        Ok(Ack { run_id: record.run_id().clone(), n_points: record.n_points(), replaced })
    }
}

/// Write the record to every sink, then export the run metrics exactly once.
pub fn publish(
    record: &RunRecord,
    sinks: &mut [&mut dyn Sink],
    exporter: &dyn MetricsExporter,
) -> Result<Vec<Ack>, SinkError> {
    let acks = sinks.iter_mut().map(|sink| sink.write(record)).collect::<Result<Vec<_>, _>>()?;
    exporter.export(&RunMetrics::from(&record.summary))?;
    Ok(acks)
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, time::Duration};

    use chrono::DateTime;
    use eos_quantities::{Euros, Hours};

    use super::*;
    use crate::{optimizer::Termination, record::RunSummary, trajectory::EnergySystem};

    fn record(run_id: &str, loss: f64) -> RunRecord {
        let start = DateTime::parse_from_rfc3339("2026-01-02T00:00:00+01:00").unwrap();
        RunRecord {
            summary: RunSummary {
                run_id: run_id.into(),
                fleet_id: "home".to_string(),
                started_at: start,
                loss: Euros(loss),
                n_actions: 3,
                termination: Termination::Converged,
                n_iterations: 10,
                n_iterations_unused: 90,
                n_evaluations: 162,
                n_rejected: 7,
                elapsed: Duration::from_millis(150),
                horizon_start: start,
                horizon_end: start,
                step_hours: Hours(0.25),
                n_steps: 0,
                energy: EnergySystem::default(),
            },
            devices: Vec::new(),
            grid: Vec::new(),
        }
    }

    #[derive(Default)]
    struct CountingExporter(Cell<usize>);

    impl MetricsExporter for CountingExporter {
        fn export(&self, _metrics: &RunMetrics) -> Result<(), SinkError> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    /// Verify that writing the same run twice keeps a single record.
    #[test]
    fn idempotent_write() {
        let mut sink = MemorySink::default();
        assert!(!sink.write(&record("a", 1.0)).unwrap().replaced);
        assert!(sink.write(&record("a", 2.0)).unwrap().replaced);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get(&"a".into()).unwrap().summary.loss, Euros(2.0));
        let ack = sink.write(&record("b", 1.0)).unwrap();
        assert_eq!(ack.run_id.as_str(), "b");
        assert!(!ack.replaced);
        assert_eq!(sink.len(), 2);
        assert!(sink.delete(&"a".into()).is_some());
        assert!(sink.get(&"a".into()).is_none());
    }

    #[test]
    fn publish_exports_once() {
        let (mut first, mut second) = (MemorySink::default(), MemorySink::default());
        let exporter = CountingExporter::default();
        let acks = publish(&record("a", 1.0), &mut [&mut first, &mut second], &exporter).unwrap();
        assert_eq!(acks.len(), 2);
        assert_eq!(exporter.0.get(), 1);
        assert_eq!((first.len(), second.len()), (1, 1));
    }
}
