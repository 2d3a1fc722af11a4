//! Per-dataset ingest progress on stderr.
//!
//! Every finished dataset produces one line: the ARK it received, or the step
//! it failed at. stdout is left to the end-of-run summary.

use serde::Serialize;
use std::path::Path;

use crate::ingest::{DatasetFailure, DatasetOutcome};

pub enum IngestProgressEvent<'a> {
    /// Discovery finished; `datasets` records will be processed.
    Started { root: &'a Path, datasets: usize },
    Succeeded {
        position: usize,
        total: usize,
        outcome: &'a DatasetOutcome,
    },
    Failed {
        position: usize,
        total: usize,
        failure: &'a DatasetFailure,
    },
}

pub trait IngestProgressReporter {
    fn report(&self, event: &IngestProgressEvent<'_>);
}

/// `[3/40] roads/roads.shp.xml  ark:/77981/gmgs0000003`
pub fn human_line(event: &IngestProgressEvent<'_>) -> String {
    match event {
        IngestProgressEvent::Started { root, datasets } => {
            format!("ingest {}: {} dataset(s)", root.display(), datasets)
        }
        IngestProgressEvent::Succeeded {
            position,
            total,
            outcome,
        } => match &outcome.ark {
            Some(ark) => format!("[{}/{}] {}  ark:/{}", position, total, outcome.dataset, ark),
            None => format!(
                "[{}/{}] {}  [{}] (dry-run)",
                position, total, outcome.dataset, outcome.rights
            ),
        },
        IngestProgressEvent::Failed {
            position,
            total,
            failure,
        } => {
            let mut line = format!(
                "[{}/{}] {}  FAILED at {}",
                position, total, failure.dataset, failure.step
            );
            if let Some(ark) = &failure.ark {
                line.push_str(&format!(" (ark:/{} minted)", ark));
            }
            line
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ProgressLine<'a> {
    Started {
        root: String,
        datasets: usize,
    },
    Dataset {
        position: usize,
        total: usize,
        dataset: &'a str,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        ark: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
    },
}

/// One JSON object per event, e.g.
/// `{"event":"dataset","position":2,"total":5,"dataset":"b.xml","ok":false,"step":"write",...}`.
pub fn json_line(event: &IngestProgressEvent<'_>) -> serde_json::Result<String> {
    let line = match event {
        IngestProgressEvent::Started { root, datasets } => ProgressLine::Started {
            root: root.display().to_string(),
            datasets: *datasets,
        },
        IngestProgressEvent::Succeeded {
            position,
            total,
            outcome,
        } => ProgressLine::Dataset {
            position: *position,
            total: *total,
            dataset: outcome.dataset.as_str(),
            ok: true,
            ark: outcome.ark.as_deref(),
            step: None,
            error: None,
        },
        IngestProgressEvent::Failed {
            position,
            total,
            failure,
        } => ProgressLine::Dataset {
            position: *position,
            total: *total,
            dataset: failure.dataset.as_str(),
            ok: false,
            ark: failure.ark.as_deref(),
            step: Some(failure.step.as_str()),
            error: Some(failure.error.as_str()),
        },
    };
    serde_json::to_string(&line)
}

pub struct HumanProgress;

impl IngestProgressReporter for HumanProgress {
    fn report(&self, event: &IngestProgressEvent<'_>) {
        eprintln!("{}", human_line(event));
    }
}

pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: &IngestProgressEvent<'_>) {
        match json_line(event) {
            Ok(line) => eprintln!("{}", line),
            Err(e) => tracing::warn!(error = %e, "could not encode progress event"),
        }
    }
}

pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: &IngestProgressEvent<'_>) {}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// The requested mode, or `human` when stderr is a terminal and `off` otherwise.
    pub fn resolve(requested: Option<ProgressMode>) -> ProgressMode {
        requested.unwrap_or(if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        })
    }

    pub fn reporter(self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(HumanProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
