use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::equipment::MachineInfo;
use crate::errors::BenchError;
use crate::types::{ModelName, OutputSize, RunOutcome};

const MACHINE_COLUMNS: [&str; 4] = [
    "Procesador",
    "Memoria Ram Gb",
    "Nucleos",
    "Procesadores logicos",
];

/// A row type with a fixed column schema.
pub trait ReportRow {
    fn header() -> Vec<String>;
    fn cells(&self) -> Vec<String>;
}

/// Timing headers plus the mean-frequency header for one executable.
fn timing_columns(prefix: &str) -> Vec<String> {
    let mut columns: Vec<String> = [
        "Time",
        "Days",
        "Hours",
        "Minutes",
        "Seconds",
        "Total Days",
        "Total Hours",
        "Total Minutes",
    ]
    .iter()
    .map(|c| format!("{} {}", prefix, c))
    .collect();
    columns.push(format!("Vel_{}", prefix));
    columns
}

fn strings(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

/// One event run of the simulation executable.
#[derive(Debug, Clone)]
pub struct TetisRow {
    pub equipment: String,
    pub model: ModelName,
    pub cells: u64,
    pub event: String,
    pub outcome: RunOutcome,
    pub results_size: OutputSize,
    pub machine: MachineInfo,
}

impl ReportRow for TetisRow {
    fn header() -> Vec<String> {
        let mut h = strings(&[
            "Equipo",
            "Cuenca",
            "Escala",
            "Escenario",
            "Modelo",
            "Celdas",
            "Entrada",
        ]);
        h.extend(timing_columns("Tetis"));
        h.extend(strings(&["Tamaño Res mb", "Tamaño Res gb"]));
        h.extend(strings(&MACHINE_COLUMNS));
        h
    }

    fn cells(&self) -> Vec<String> {
        let mut c = vec![
            self.equipment.clone(),
            self.model.basin.clone(),
            self.model.scale.clone(),
            self.model.scenario.clone(),
            self.model.id.clone(),
            self.cells.to_string(),
            self.event.clone(),
        ];
        c.extend(self.outcome.cells());
        c.extend(self.results_size.cells());
        c.extend(self.machine.cells());
        c
    }
}

/// One model pass of the topology (Toparc) and hydraulic (Hantec) executables.
#[derive(Debug, Clone)]
pub struct TopologyRow {
    pub equipment: String,
    pub model: ModelName,
    /// `None` when Toparc left no readable topology file.
    pub cells: Option<u64>,
    pub toparc: RunOutcome,
    pub hantec: RunOutcome,
    pub topology_size: OutputSize,
    pub hantec_size: OutputSize,
    pub machine: MachineInfo,
}

impl ReportRow for TopologyRow {
    fn header() -> Vec<String> {
        let mut h = strings(&["Equipo", "Cuenca", "Escala", "Escenario", "Modelo", "Celdas"]);
        h.extend(timing_columns("Toparc"));
        h.extend(timing_columns("Hantec"));
        h.extend(strings(&[
            "Tamaño Topolco mb",
            "Tamaño Topolco gb",
            "Tamaño Hantec mb",
            "Tamaño Hantec gb",
        ]));
        h.extend(strings(&MACHINE_COLUMNS));
        h
    }

    fn cells(&self) -> Vec<String> {
        let mut c = vec![
            self.equipment.clone(),
            self.model.basin.clone(),
            self.model.scale.clone(),
            self.model.scenario.clone(),
            self.model.id.clone(),
            self.cells.map(|n| n.to_string()).unwrap_or_default(),
        ];
        c.extend(self.toparc.cells());
        c.extend(self.hantec.cells());
        c.extend(self.topology_size.cells());
        c.extend(self.hantec_size.cells());
        c.extend(self.machine.cells());
        c
    }
}

/// Streaming CSV sink: every appended row is flushed to disk immediately, so
/// an interrupted batch keeps every completed run.
///
/// The file is only replaced when the first row arrives. A batch that aborts
/// before any run finishes leaves the previous report in place.
pub struct ReportWriter<R> {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    rows: usize,
    _row: PhantomData<R>,
}

impl<R: ReportRow> ReportWriter<R> {
    pub fn new(path: &Path) -> Self {
        ReportWriter {
            path: path.to_path_buf(),
            writer: None,
            rows: 0,
            _row: PhantomData,
        }
    }

    pub fn append(&mut self, row: &R) -> Result<(), BenchError> {
        let err = |source| BenchError::ReportWrite {
            path: self.path.clone(),
            source,
        };

        if self.writer.is_none() {
            // Truncates whatever an earlier batch left behind.
            let mut writer = csv::Writer::from_path(&self.path).map_err(err)?;
            writer.write_record(R::header()).map_err(err)?;
            self.writer = Some(writer);
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(row.cells()).map_err(err)?;
            writer.flush().map_err(|e| err(e.into()))?;
            writer.get_ref().sync_data().map_err(|e| err(e.into()))?;
        }
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
