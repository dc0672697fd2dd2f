//! InfluxDB v2 line protocol over HTTP.
//!
//! Points are keyed by the `run` tag and the step timestamp, so writing the same run again
//! overwrites the earlier points instead of duplicating them.

use std::{
    fmt::{Display, Formatter, Write},
    time::Duration,
};

use eos_core::{
    MetricsExporter,
    RunMetrics,
    Sink,
    SinkError,
    Timestamp,
    persistence::Ack,
    record::{DevicePoint, GridPoint, RunRecord, RunSummary},
};
use itertools::Itertools;
use ureq::Agent;

use crate::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    String(String),
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Single line of the line protocol.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    measurement: &'static str,
    tags: Vec<(&'static str, String)>,
    fields: Vec<(&'static str, FieldValue)>,

    /// Nanoseconds since the epoch, the server time when missing.
    timestamp: Option<i64>,
}

impl Point {
    pub const fn new(measurement: &'static str) -> Self {
        Self { measurement, tags: Vec::new(), fields: Vec::new(), timestamp: None }
    }

    /// Empty tag values are not allowed by the protocol and are skipped.
    pub fn tag(mut self, key: &'static str, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.tags.push((key, value));
        }
        self
    }

    /// The protocol has no representation for non-finite floats, those fields are skipped.
    pub fn field(mut self, key: &'static str, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        if !matches!(value, FieldValue::Float(value) if !value.is_finite()) {
            self.fields.push((key, value));
        }
        self
    }

    /// Out of the nanosecond range, the server time is used.
    pub fn timestamp(mut self, at: Timestamp) -> Self {
        self.timestamp = at.timestamp_nanos_opt();
        self
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_escaped(f, self.measurement, &[',', ' '])?;
        for (key, value) in &self.tags {
            f.write_char(',')?;
            write_escaped(f, key, &[',', '=', ' '])?;
            f.write_char('=')?;
            write_escaped(f, value, &[',', '=', ' '])?;
        }
        for (index, (key, value)) in self.fields.iter().enumerate() {
            f.write_char(if index == 0 { ' ' } else { ',' })?;
            write_escaped(f, key, &[',', '=', ' '])?;
            f.write_char('=')?;
            match value {
                FieldValue::Float(value) => write!(f, "{value:?}")?,
                FieldValue::Integer(value) => write!(f, "{value}i")?,
                FieldValue::String(value) => {
                    f.write_char('"')?;
                    write_escaped(f, value, &['"', '\\'])?;
                    f.write_char('"')?;
                }
            }
        }
        if let Some(timestamp) = self.timestamp {
            write!(f, " {timestamp}")?;
        }
        Ok(())
    }
}

fn write_escaped(f: &mut Formatter<'_>, value: &str, special: &[char]) -> std::fmt::Result {
    for c in value.chars() {
        if special.contains(&c) {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    Ok(())
}

impl From<&DevicePoint> for Point {
    fn from(point: &DevicePoint) -> Self {
        let line = Self::new("device")
            .tag("run", &point.key.run_id)
            .tag("device", &point.device)
            .field("decision", point.decision.label())
            .field("power_kw", point.decision.power().0)
            .field("import_kwh", point.flow.import.0)
            .field("export_kwh", point.flow.export.0)
            .field("wear_cost_eur", point.wear_cost.0);
        let line = match point.level {
            Some(level) => line.field("level_kwh", level.0),
            None => line,
        };
        line.timestamp(point.timestamp)
    }
}

impl From<&GridPoint> for Point {
    fn from(point: &GridPoint) -> Self {
        Self::new("grid")
            .tag("run", &point.key.run_id)
            .field("demand_kw", point.demand.0)
            .field("import_kwh", point.import.0)
            .field("export_kwh", point.export.0)
            .field("import_price_eur_kwh", point.import_price.0)
            .field("export_price_eur_kwh", point.export_price.0)
            .field("grid_cost_eur", point.grid_cost.0)
            .timestamp(point.timestamp)
    }
}

impl From<&RunSummary> for Point {
    fn from(summary: &RunSummary) -> Self {
        Self::new("run")
            .tag("run", &summary.run_id)
            .tag("fleet", &summary.fleet_id)
            .tag("termination", summary.termination)
            .field("loss_eur", summary.loss.0)
            .field("n_actions", summary.n_actions)
            .field("produced_kwh", summary.energy.produced.0)
            .field("consumed_kwh", summary.energy.consumed.0)
            .field("charged_kwh", summary.energy.charged.0)
            .field("discharged_kwh", summary.energy.discharged.0)
            .field("imported_kwh", summary.energy.imported.0)
            .field("exported_kwh", summary.energy.exported.0)
            .timestamp(summary.horizon_start)
    }
}

impl From<&RunMetrics> for Point {
    fn from(metrics: &RunMetrics) -> Self {
        Self::new("run_metrics")
            .tag("run", &metrics.run_id)
            .tag("termination", metrics.termination)
            .field("duration_s", metrics.duration.as_secs_f64())
            .field("n_iterations", metrics.n_iterations)
            .field("n_evaluations", metrics.n_evaluations)
            .field("n_rejected", metrics.n_rejected)
            .field("objective_eur", metrics.objective.0)
    }
}

/// Encode the whole record, one line per point.
#[must_use]
pub fn encode(record: &RunRecord) -> String {
    let summary = Point::from(&record.summary);
    let devices = record.devices.iter().map(Point::from);
    let grid = record.grid.iter().map(Point::from);
    [summary].into_iter().chain(devices).chain(grid).join("\n")
}

#[must_use]
pub struct Client {
    agent: Agent,
    write_url: String,
    org: String,
    bucket: String,
    token: String,
}

impl Client {
    pub fn new(url: &str, org: String, bucket: String, token: &str) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(10)))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            write_url: format!("{}/api/v2/write", url.trim_end_matches('/')),
            org,
            bucket,
            token: format!("Token {token}"),
        }
    }

    #[instrument(skip_all, fields(n_bytes = body.len()))]
    fn write(&self, body: String) -> Result<(), SinkError> {
        debug!("writing…");
        let mut response = self
            .agent
            .post(&self.write_url)
            .query("org", &self.org)
            .query("bucket", &self.bucket)
            .query("precision", "ns")
            .header("Authorization", &self.token)
            .header("Content-Type", "text/plain; charset=utf-8")
            .send(body)
            .map_err(|error| SinkError::Transport(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(SinkError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

/// Stores the run points.
#[must_use]
pub struct InfluxSink<'a>(pub &'a Client);

impl Sink for InfluxSink<'_> {
    fn write(&mut self, record: &RunRecord) -> Result<Ack, SinkError> {
        self.0.write(encode(record))?;
        // Matching points are overwritten on the server, which does not report it back.
        Ok(Ack { run_id: record.run_id().clone(), n_points: record.n_points(), replaced: false })
    }
}

/// Exports one point per run.
#[must_use]
pub struct InfluxMetrics<'a>(pub &'a Client);

impl MetricsExporter for InfluxMetrics<'_> {
    fn export(&self, metrics: &RunMetrics) -> Result<(), SinkError> {
        self.0.write(Point::from(metrics).to_string())
    }
}
