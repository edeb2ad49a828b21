use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::discover::{discover_events, discover_models, parse_model_name, read_cell_count};
use crate::equipment::MachineInfo;
use crate::errors::BenchError;
use crate::frequency::{FrequencySource, TelemetryLog};
use crate::monitor::{MonitorOptions, resolve_program, run_monitored};
use crate::patch::{ControlPatch, patch_control_files};
use crate::report::{ReportRow, ReportWriter, TetisRow, TopologyRow};
use crate::types::{ModelDir, ModelListing, OutputSize, RunOutcome};

/// Files copied into every model by `copy-calib` when none are named.
pub const DEFAULT_CALIBRATION_FILES: [&str; 2] = ["Calib.txt", "FactorETmes.txt"];

/// What a finished batch produced.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub report: PathBuf,
    pub rows: usize,
    pub failed_runs: usize,
    pub elapsed: Duration,
}

/// Runs the model executables one at a time and records every run.
pub struct Driver<S> {
    config: Config,
    machine: MachineInfo,
    source: S,
}

impl Driver<TelemetryLog> {
    /// Driver reading machine facts and telemetry from the configured files.
    pub fn from_config(config: Config) -> Result<Self> {
        let machine = MachineInfo::load(&config.equipment_file)?;
        let source = TelemetryLog::new(&config.telemetry_file, &config.telemetry_column);
        Ok(Driver::new(config, machine, source))
    }
}

impl<S: FrequencySource> Driver<S> {
    pub fn new(config: Config, machine: MachineInfo, source: S) -> Self {
        Driver {
            config,
            machine,
            source,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            poll_interval: self.config.poll_interval(),
            timeout: self.config.timeout(),
        }
    }

    fn models(&self) -> Result<Vec<ModelDir>> {
        std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.config.output_dir.display()
            )
        })?;
        discover_models(
            &self.config.models_dir,
            std::slice::from_ref(&self.config.output_dir),
        )
    }

    /// Run the simulation executable once per event of every model.
    ///
    /// A failing control-setup step aborts the whole batch; rows already
    /// appended stay in the report.
    pub fn run_tetis(&mut self) -> Result<BatchSummary> {
        let start = Instant::now();
        let models = self.models()?;
        let report_path = self.config.tetis_report_path();
        let mut report = ReportWriter::<TetisRow>::new(&report_path);
        let mut failed_runs = 0;

        log::info!("Starting model analysis: {} models", models.len());

        for (i, model) in models.iter().enumerate() {
            log::info!("Processing model {} of {}: {}", i + 1, models.len(), model.dir_name);

            let name = match parse_model_name(&model.dir_name) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("Skipping {}: {}", model.path.display(), e);
                    continue;
                }
            };

            let files = &self.config.files;
            let events = discover_events(&model.path, &files.event_dir, &files.event_extension)?;
            if events.is_empty() {
                log::warn!("No event files in {}", model.path.join(&files.event_dir).display());
                continue;
            }

            let cells = read_cell_count(&model.path.join(&files.topology))?;
            let model_path = std::path::absolute(&model.path)?;

            for event in &events {
                self.copy_executables(&model.path)?;

                log::info!("Start {}: {}", event.id, name.id);
                patch_control_files(
                    &model.path.join(&files.control),
                    &model.path.join(&files.control_copy),
                    &ControlPatch::for_model(&model_path).with_event(&event.relative_path),
                )?;

                let exes = &self.config.executables;
                log::info!("Running {} for {}: {}", exes.control, event.id, name.id);
                run_control(&exes.control, &model.path)?;

                log::info!("Running {} for {}: {}", exes.tetis, event.id, model.dir_name);
                let options = self.monitor_options();
                let outcome = run_monitored(
                    &self.config.executables.tetis,
                    &model.path,
                    &mut self.source,
                    options,
                );
                if !outcome.is_completed() {
                    failed_runs += 1;
                }
                let results_size = measure_output(&outcome, &model.path.join(&files.results));

                let row = TetisRow {
                    equipment: self.config.equipment.clone(),
                    model: name.clone(),
                    cells,
                    event: event.id.clone(),
                    outcome,
                    results_size,
                    machine: self.machine.clone(),
                };
                log::info!("Saving results to {}", report_path.display());
                report.append(&row)?;
                log::info!("End {}: {}", event.id, name.id);
            }

            log::info!("Finished model {} of {}", i + 1, models.len());
        }

        log::info!("Model analysis finished");
        Ok(summary(&report, failed_runs, start))
    }

    /// Run the topology and hydraulic-parameter executables once per model.
    pub fn run_topology(&mut self) -> Result<BatchSummary> {
        let start = Instant::now();
        let models = self.models()?;
        let report_path = self.config.topology_report_path();
        let mut report = ReportWriter::<TopologyRow>::new(&report_path);
        let mut failed_runs = 0;

        for (i, model) in models.iter().enumerate() {
            log::info!("Processing model {} of {}: {}", i + 1, models.len(), model.dir_name);

            let name = match parse_model_name(&model.dir_name) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("Skipping {}: {}", model.path.display(), e);
                    continue;
                }
            };

            let files = self.config.files.clone();
            let exes = self.config.executables.clone();
            let options = self.monitor_options();

            let model_path = std::path::absolute(&model.path)?;
            patch_control_files(
                &model.path.join(&files.control),
                &model.path.join(&files.control_copy),
                &ControlPatch::for_model(&model_path),
            )?;
            self.copy_executables(&model.path)?;

            log::info!("Generating topology: {}", model.dir_name);
            let toparc = run_monitored(&exes.toparc, &model.path, &mut self.source, options);
            let topology_path = model.path.join(&files.topology);
            let cells = match read_cell_count(&topology_path) {
                Ok(cells) => Some(cells),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            };
            let topology_size = measure_output(&toparc, &topology_path);

            log::info!("Generating hydraulic parameters: {}", model.dir_name);
            let hantec = run_monitored(&exes.hantec, &model.path, &mut self.source, options);
            let hantec_size = measure_output(&hantec, &model.path.join(&files.hantec));

            failed_runs += [&toparc, &hantec].iter().filter(|o| !o.is_completed()).count();

            report.append(&TopologyRow {
                equipment: self.config.equipment.clone(),
                model: name,
                cells,
                toparc,
                hantec,
                topology_size,
                hantec_size,
                machine: self.machine.clone(),
            })?;
        }

        Ok(summary(&report, failed_runs, start))
    }

    fn copy_executables(&self, model_dir: &Path) -> Result<()> {
        for exe in self.config.executables.all() {
            let from = self.config.executables_dir.join(exe);
            std::fs::copy(&from, model_dir.join(exe)).with_context(|| {
                format!("Failed to copy {} into {}", from.display(), model_dir.display())
            })?;
        }
        Ok(())
    }
}

fn summary<R: ReportRow>(
    report: &ReportWriter<R>,
    failed_runs: usize,
    start: Instant,
) -> BatchSummary {
    BatchSummary {
        report: report.path().to_path_buf(),
        rows: report.rows(),
        failed_runs,
        elapsed: start.elapsed(),
    }
}

/// Run the control-setup executable to completion. Any failure is fatal.
pub fn run_control(exe: &str, model_dir: &Path) -> Result<(), BenchError> {
    let failed = |detail: String| BenchError::ControlFailed {
        exe: exe.to_string(),
        dir: model_dir.to_path_buf(),
        detail,
    };

    let status = Command::new(resolve_program(exe, model_dir))
        .current_dir(model_dir)
        .status()
        .map_err(|e| failed(e.to_string()))?;

    if !status.success() {
        return Err(failed(format!("exited with {}", status)));
    }
    Ok(())
}

/// Size of a run's output file. Failed runs inherit their failure.
pub fn measure_output(outcome: &RunOutcome, path: &Path) -> OutputSize {
    if !outcome.is_completed() {
        return OutputSize::NotExecutable;
    }
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => OutputSize::Measured { bytes: meta.len() },
        _ => {
            log::warn!("No output file at {}", path.display());
            OutputSize::Missing
        }
    }
}

/// Describe every model the benchmark would visit, without touching any file.
pub fn list_models(config: &Config) -> Result<Vec<ModelListing>> {
    let files = &config.files;
    let models = discover_models(&config.models_dir, std::slice::from_ref(&config.output_dir))?;

    let mut listing = Vec::with_capacity(models.len());
    for model in models {
        let events = if model.path.join(&files.event_dir).is_dir() {
            discover_events(&model.path, &files.event_dir, &files.event_extension)?
        } else {
            Vec::new()
        };
        listing.push(ModelListing {
            name: parse_model_name(&model.dir_name).ok(),
            cells: read_cell_count(&model.path.join(&files.topology)).ok(),
            events,
            dir_name: model.dir_name,
            path: model.path,
        });
    }
    Ok(listing)
}

/// Where a calibration file lands inside a model directory.
pub fn calibration_target(file_name: &str) -> &str {
    if file_name.contains("Hantec") {
        "Hantec.sds"
    } else if file_name.contains("Paramgeo") {
        "Paramgeo.txt"
    } else {
        file_name
    }
}

/// Copy calibration files from `source_dir` into every model directory,
/// overwriting. Missing source files are logged and skipped.
///
/// Returns the number of files copied.
pub fn copy_calibration(source_dir: &Path, models: &[ModelDir], files: &[String]) -> Result<usize> {
    let mut copied = 0;
    for (i, model) in models.iter().enumerate() {
        log::info!("Copying to {}: {} of {}", model.dir_name, i + 1, models.len());
        for file in files {
            let from = source_dir.join(file);
            if !from.is_file() {
                log::warn!("File {} not found at {}", file, from.display());
                continue;
            }
            let to = model.path.join(calibration_target(file));
            std::fs::copy(&from, &to)
                .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}
