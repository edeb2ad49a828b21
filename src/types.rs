use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

/// Marker written into every timing and size cell of a failed run.
pub const NOT_EXECUTABLE: &str = "NOT EXECUTABLE";

/// Tokens decoded from a model directory name such as `Fe_RioX_1k_BASE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelName {
    pub basin: String,
    pub scale: String,
    pub scenario: String,
    pub id: String,
}

/// A model directory found under the models root.
#[derive(Debug, Clone, Serialize)]
pub struct ModelDir {
    pub dir_name: String,
    pub path: PathBuf,
}

/// One event ("Fe") file of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: String,
    /// Path relative to the model directory, as the control file expects it.
    pub relative_path: String,
}

/// Dry-run view of one model directory.
#[derive(Debug, Clone, Serialize)]
pub struct ModelListing {
    pub dir_name: String,
    pub path: PathBuf,
    /// `None` when the directory name does not decode.
    pub name: Option<ModelName>,
    pub cells: Option<u64>,
    pub events: Vec<Event>,
}

#[derive(Clone, ValueEnum)]
pub enum OutputFormat {
    Default,
    Short,
}

/// Elapsed wall-clock time split into calendar units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElapsedBreakdown {
    pub secs: f64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    /// Remainder seconds, rounded to one decimal.
    pub seconds: f64,
    pub total_days: f64,
    pub total_hours: f64,
    pub total_minutes: f64,
}

impl ElapsedBreakdown {
    pub fn from_secs(secs: f64) -> Self {
        let secs = secs.max(0.0);
        ElapsedBreakdown {
            secs,
            days: (secs / 86_400.0).floor() as u64,
            hours: ((secs % 86_400.0) / 3_600.0).floor() as u64,
            minutes: ((secs % 3_600.0) / 60.0).floor() as u64,
            seconds: ((secs % 60.0) * 10.0).round() / 10.0,
            total_days: secs / 86_400.0,
            total_hours: secs / 3_600.0,
            total_minutes: secs / 60.0,
        }
    }
}

/// Measurements of a monitored process that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTiming {
    pub elapsed: ElapsedBreakdown,
    /// NaN when no telemetry sample was collected.
    pub mean_frequency_ghz: f64,
    pub samples: usize,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Launch(String),
    Wait(String),
    TimedOut { after_secs: u64 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Launch(detail) => write!(f, "launch failed: {}", detail),
            FailureReason::Wait(detail) => write!(f, "lost track of process: {}", detail),
            FailureReason::TimedOut { after_secs } => {
                write!(f, "killed after {}s timeout", after_secs)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunTiming),
    NotExecutable(FailureReason),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    /// The nine report cells: time, days, hours, minutes, seconds, total
    /// days, total hours, total minutes, mean GHz.
    pub fn cells(&self) -> [String; 9] {
        match self {
            RunOutcome::Completed(t) => {
                let e = &t.elapsed;
                [
                    e.secs.to_string(),
                    e.days.to_string(),
                    e.hours.to_string(),
                    e.minutes.to_string(),
                    e.seconds.to_string(),
                    e.total_days.to_string(),
                    e.total_hours.to_string(),
                    e.total_minutes.to_string(),
                    t.mean_frequency_ghz.to_string(),
                ]
            }
            RunOutcome::NotExecutable(_) => std::array::from_fn(|_| NOT_EXECUTABLE.to_string()),
        }
    }
}

/// Size of a file produced by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    Measured { bytes: u64 },
    /// The run completed but left no file behind.
    Missing,
    NotExecutable,
}

impl OutputSize {
    pub fn kb(&self) -> Option<f64> {
        match self {
            OutputSize::Measured { bytes } => Some(*bytes as f64 / 1024.0),
            _ => None,
        }
    }

    pub fn mb(&self) -> Option<f64> {
        self.kb().map(|kb| kb / 1024.0)
    }

    pub fn gb(&self) -> Option<f64> {
        self.mb().map(|mb| mb / 1024.0)
    }

    /// MB and GB report cells.
    pub fn cells(&self) -> [String; 2] {
        match self {
            OutputSize::Measured { .. } => [
                self.mb().map(|v| v.to_string()).unwrap_or_default(),
                self.gb().map(|v| v.to_string()).unwrap_or_default(),
            ],
            OutputSize::Missing => [String::new(), String::new()],
            OutputSize::NotExecutable => [NOT_EXECUTABLE.to_string(), NOT_EXECUTABLE.to_string()],
        }
    }
}
