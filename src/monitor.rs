use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

use crate::frequency::FrequencySource;
use crate::types::{ElapsedBreakdown, FailureReason, RunOutcome, RunTiming};

#[derive(Debug, Clone, Copy)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    /// `None` waits for the process however long it takes.
    pub timeout: Option<Duration>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        MonitorOptions {
            poll_interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

/// Run `exe` inside `working_dir`, sampling `source` once per poll interval
/// until the process exits.
///
/// Never returns an error: anything that prevents a clean measurement is
/// reported as [`RunOutcome::NotExecutable`].
pub fn run_monitored(
    exe: &str,
    working_dir: &Path,
    source: &mut dyn FrequencySource,
    options: MonitorOptions,
) -> RunOutcome {
    log::info!("Starting {} in {}", exe, working_dir.display());

    let program = resolve_program(exe, working_dir);
    let mut child = match Command::new(&program).current_dir(working_dir).spawn() {
        Ok(child) => child,
        Err(e) => {
            log::error!("Could not launch {}: {}", program.display(), e);
            return RunOutcome::NotExecutable(FailureReason::Launch(e.to_string()));
        }
    };

    let start = Instant::now();
    let mut samples = Vec::new();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                log::error!("Lost track of {}: {}", exe, e);
                kill_quietly(&mut child);
                return RunOutcome::NotExecutable(FailureReason::Wait(e.to_string()));
            }
        }

        if let Some(timeout) = options.timeout
            && start.elapsed() >= timeout
        {
            log::error!("{} still running after {}s, killing it", exe, timeout.as_secs());
            kill_quietly(&mut child);
            return RunOutcome::NotExecutable(FailureReason::TimedOut {
                after_secs: timeout.as_secs(),
            });
        }

        if let Some(mhz) = source.sample() {
            log::info!("Frequency: {:.2} MHz", mhz);
            samples.push(mhz);
        }

        std::thread::sleep(options.poll_interval);
    };

    let elapsed = start.elapsed().as_secs_f64();
    let exit_code = status.code();
    if !status.success() {
        log::warn!("{} exited with {}", exe, status);
    }

    RunOutcome::Completed(RunTiming {
        elapsed: ElapsedBreakdown::from_secs(elapsed),
        mean_frequency_ghz: mean_frequency_ghz(&samples),
        samples: samples.len(),
        exit_code,
    })
}

/// Mean of MHz samples expressed in GHz; NaN when nothing was sampled.
pub fn mean_frequency_ghz(samples_mhz: &[f64]) -> f64 {
    if samples_mhz.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = samples_mhz.iter().sum();
    (sum / samples_mhz.len() as f64) / 1000.0
}

/// Executables are looked up in the working directory first, then on `PATH`.
///
/// A local hit is returned absolute: the child resolves a relative program
/// path after it has already changed into `working_dir`.
pub(crate) fn resolve_program(exe: &str, working_dir: &Path) -> PathBuf {
    let local = working_dir.join(exe);
    if !local.is_file() {
        return PathBuf::from(exe);
    }
    std::path::absolute(&local).unwrap_or(local)
}

fn kill_quietly(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
