use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::errors::BenchError;

const PROCESSOR_LABEL: &str = "Nombre del procesador:";
const RAM_LABEL: &str = "Tamaño de memoria total:";
const CORES_LABEL: &str = "Número de núcleos de procesador:";
const LOGICAL_LABEL: &str = "Número de procesadores lógicos:";

/// Static facts about the benchmark host, repeated into every report row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MachineInfo {
    pub processor: String,
    pub ram: String,
    pub cores: String,
    pub logical_processors: String,
}

impl MachineInfo {
    pub fn load(path: &Path) -> Result<MachineInfo> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read equipment file {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(MachineInfo::parse(&text)?)
    }

    /// Parse `label:,value` lines. The first line with a comma-separated
    /// field containing the label provides the value from the next field.
    pub fn parse(text: &str) -> Result<MachineInfo, BenchError> {
        let rows: Vec<Vec<&str>> = text
            .lines()
            .map(|line| line.trim().split(',').collect())
            .collect();

        Ok(MachineInfo {
            processor: lookup(&rows, PROCESSOR_LABEL)?,
            ram: lookup(&rows, RAM_LABEL)?,
            cores: lookup(&rows, CORES_LABEL)?,
            logical_processors: lookup(&rows, LOGICAL_LABEL)?,
        })
    }

    pub fn cells(&self) -> [String; 4] {
        [
            self.processor.clone(),
            self.ram.clone(),
            self.cores.clone(),
            self.logical_processors.clone(),
        ]
    }
}

fn lookup(rows: &[Vec<&str>], label: &'static str) -> Result<String, BenchError> {
    rows.iter()
        .find(|fields| fields.iter().any(|f| f.contains(label)))
        .map(|fields| fields.get(1).map(|v| v.trim().to_string()).unwrap_or_default())
        .ok_or(BenchError::EquipmentFieldMissing { label })
}
