use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::IngestOutcome;

/// Per-source tallies for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub scraped: usize,
    pub new: usize,
    pub duplicates: usize,
    pub errors: usize,
}

impl SourceStats {
    pub fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::New(_) => self.new += 1,
            IngestOutcome::Duplicate => self.duplicates += 1,
            IngestOutcome::Error(_) => self.errors += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceOutcome {
    Completed(SourceStats),
    /// The adapter itself failed; no articles were processed.
    Failed { error: String },
}

impl SourceOutcome {
    pub fn stats(&self) -> Option<&SourceStats> {
        match self {
            SourceOutcome::Completed(stats) => Some(stats),
            SourceOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SourceOutcome::Failed { error } => Some(error),
            SourceOutcome::Completed(_) => None,
        }
    }
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    #[serde(serialize_with = "serialize_in_order")]
    pub sources: Vec<(String, SourceOutcome)>,
    pub total_scraped: usize,
    pub total_new: usize,
    pub total_duplicates: usize,
    pub total_errors: usize,
    pub duration_seconds: f64,
}

impl RunReport {
    pub fn start(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            sources: Vec::new(),
            total_scraped: 0,
            total_new: 0,
            total_duplicates: 0,
            total_errors: 0,
            duration_seconds: 0.0,
        }
    }

    pub fn record_source(&mut self, name: impl Into<String>, stats: SourceStats) {
        self.total_scraped += stats.scraped;
        self.total_new += stats.new;
        self.total_duplicates += stats.duplicates;
        self.total_errors += stats.errors;
        self.sources.push((name.into(), SourceOutcome::Completed(stats)));
    }

    pub fn record_failure(&mut self, name: impl Into<String>, error: impl Into<String>) {
        self.sources.push((
            name.into(),
            SourceOutcome::Failed {
                error: error.into(),
            },
        ));
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.duration_seconds = elapsed.as_secs_f64();
    }

    pub fn source(&self, name: &str) -> Option<&SourceOutcome> {
        self.sources
            .iter()
            .find(|(source, _)| source == name)
            .map(|(_, outcome)| outcome)
    }
}

fn serialize_in_order<S: Serializer>(
    sources: &[(String, SourceOutcome)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(sources.len()))?;
    for (name, outcome) in sources {
        map.serialize_entry(name, outcome)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IngestError;

    #[test]
    fn test_totals_skip_failed_sources() {
        let mut report = RunReport::start(Utc::now());
        let mut stats = SourceStats {
            scraped: 3,
            ..Default::default()
        };
        stats.record(&IngestOutcome::New(1));
        stats.record(&IngestOutcome::Duplicate);
        stats.record(&IngestOutcome::Error(IngestError::MissingField("url")));
        report.record_source("IEEE Spectrum", stats);
        report.record_failure("TechCrunch", "connection reset");

        assert_eq!(report.total_scraped, 3);
        assert_eq!(report.total_new, 1);
        assert_eq!(report.total_duplicates, 1);
        assert_eq!(report.total_errors, 1);
        assert_eq!(
            report.source("TechCrunch").and_then(|o| o.error()),
            Some("connection reset")
        );
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = RunReport::start(Utc::now());
        report.record_source(
            "MIT News",
            SourceStats {
                scraped: 2,
                new: 2,
                duplicates: 0,
                errors: 0,
            },
        );
        report.record_failure("NVIDIA Blog", "boom");
        report.finish(Duration::from_millis(1500));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sources"]["MIT News"]["new"], 2);
        assert_eq!(json["sources"]["MIT News"]["duplicates"], 0);
        assert_eq!(json["sources"]["NVIDIA Blog"]["error"], "boom");
        assert_eq!(json["total_new"], 2);
        assert_eq!(json["duration_seconds"], 1.5);
    }

    #[test]
    fn test_sources_serialize_in_run_order() {
        let mut report = RunReport::start(Utc::now());
        report.record_source("Zeta", SourceStats::default());
        report.record_source("Alpha", SourceStats::default());

        let json = serde_json::to_string(&report).unwrap();
        let zeta = json.find("\"Zeta\"").unwrap();
        let alpha = json.find("\"Alpha\"").unwrap();
        assert!(zeta < alpha);
    }
}
