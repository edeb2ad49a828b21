use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("Could not determine a config directory. Pass --config explicitly.")]
    ConfigDirNotFound,

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    #[error("Models directory not found at {path}")]
    ModelsDirNotFound { path: PathBuf },

    #[error("Model directory name '{name}' must look like <prefix>_<basin>_<scale>_<scenario>")]
    InvalidModelName { name: String },

    #[error("Failed to read cell count from {path}: {detail}")]
    TopologyParse { path: PathBuf, detail: String },

    #[error("Control file {path} has {lines} lines, field '{field}' lives on line {line}")]
    ControlFileTooShort {
        path: PathBuf,
        field: &'static str,
        line: usize,
        lines: usize,
    },

    #[error("{exe} failed in {dir}: {detail}")]
    ControlFailed {
        exe: String,
        dir: PathBuf,
        detail: String,
    },

    #[error("Equipment file has no entry for '{label}'")]
    EquipmentFieldMissing { label: &'static str },

    #[error("Failed to write report {path}: {source}")]
    ReportWrite { path: PathBuf, source: csv::Error },
}
