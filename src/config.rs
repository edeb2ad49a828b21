use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::BenchError;

pub const DEFAULT_TELEMETRY_COLUMN: &str = "Relojes núcleo (avg) [MHz]";

/// Benchmark configuration, read from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Host label written into every row and into the report file names.
    pub equipment: String,
    pub models_dir: PathBuf,
    pub executables_dir: PathBuf,
    pub output_dir: PathBuf,
    /// CSV continuously appended by the hardware monitoring tool.
    pub telemetry_file: PathBuf,
    pub equipment_file: PathBuf,
    #[serde(default = "default_telemetry_column")]
    pub telemetry_column: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Kill a monitored process after this many seconds. Unset waits forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub executables: Executables,
    #[serde(default)]
    pub files: ModelFiles,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Executables {
    pub toparc: String,
    pub hantec: String,
    pub control: String,
    pub tetis: String,
}

impl Default for Executables {
    fn default() -> Self {
        Executables {
            toparc: "Toparc.exe".to_string(),
            hantec: "Hantec.exe".to_string(),
            control: "Control.exe".to_string(),
            tetis: "Tetis.exe".to_string(),
        }
    }
}

impl Executables {
    pub fn all(&self) -> [&str; 4] {
        [
            self.toparc.as_str(),
            self.hantec.as_str(),
            self.control.as_str(),
            self.tetis.as_str(),
        ]
    }
}

/// Names of the files the model executables read and write.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelFiles {
    pub control: String,
    pub control_copy: String,
    pub topology: String,
    pub hantec: String,
    pub results: String,
    pub event_dir: String,
    pub event_extension: String,
}

impl Default for ModelFiles {
    fn default() -> Self {
        ModelFiles {
            control: "FileSSP.tet".to_string(),
            control_copy: "FileSSP.txt".to_string(),
            topology: "Topolco.sds".to_string(),
            hantec: "Hantec.sds".to_string(),
            results: "Fichero_resultados.res".to_string(),
            event_dir: "Fe".to_string(),
            event_extension: "txt".to_string(),
        }
    }
}

fn default_telemetry_column() -> String {
    DEFAULT_TELEMETRY_COLUMN.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, BenchError> {
        let text = std::fs::read_to_string(path).map_err(|source| BenchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml(&text, path)
    }

    pub fn from_toml(text: &str, path: &Path) -> Result<Config, BenchError> {
        toml::from_str(text).map_err(|e| BenchError::ConfigParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// `{config_dir}/hydrobench/config.toml`
    pub fn default_path() -> Result<PathBuf, BenchError> {
        dirs::config_dir()
            .map(|dir| dir.join("hydrobench").join("config.toml"))
            .ok_or(BenchError::ConfigDirNotFound)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn tetis_report_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("Results_tetis_{}.csv", self.equipment))
    }

    pub fn topology_report_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("Results_toparc_hantec_{}.csv", self.equipment))
    }
}
