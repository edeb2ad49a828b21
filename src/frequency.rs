use std::fs::File;
use std::path::{Path, PathBuf};

/// Something the process monitor can poll for a clock-frequency reading in MHz.
pub trait FrequencySource {
    /// `None` means "no sample this tick".
    fn sample(&mut self) -> Option<f64>;
}

/// A telemetry CSV written continuously by a hardware monitoring tool.
#[derive(Debug, Clone)]
pub struct TelemetryLog {
    pub path: PathBuf,
    pub column: String,
}

impl TelemetryLog {
    pub fn new(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        TelemetryLog {
            path: path.into(),
            column: column.into(),
        }
    }

    pub fn last_frequency(&self) -> Option<f64> {
        read_last_frequency(&self.path, &self.column)
    }
}

impl FrequencySource for TelemetryLog {
    fn sample(&mut self) -> Option<f64> {
        self.last_frequency()
    }
}

/// Read the most recent populated value of `column` from the telemetry CSV.
///
/// Comma decimal separators are normalised before parsing. Every failure
/// (missing file, unknown column, I/O error mid-read, unparsable value) maps
/// to `None`: the file is being appended to while we read it.
pub fn read_last_frequency(path: &Path, column: &str) -> Option<f64> {
    let file = File::open(path).ok()?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(file);

    let headers = reader.byte_headers().ok()?;
    let index = headers.iter().position(|h| {
        let name = String::from_utf8_lossy(h);
        name.trim_start_matches('\u{feff}').trim() == column
    })?;

    let mut last: Option<String> = None;
    let mut record = csv::ByteRecord::new();
    loop {
        match reader.read_byte_record(&mut record) {
            Ok(true) => {
                // Short rows (e.g. a line still being written) have no value here.
                if let Some(field) = record.get(index) {
                    let value = String::from_utf8_lossy(field);
                    if !value.trim().is_empty() {
                        last = Some(value.into_owned());
                    }
                }
            }
            Ok(false) => break,
            Err(_) => return None,
        }
    }

    parse_reading(&last?)
}

fn parse_reading(raw: &str) -> Option<f64> {
    raw.replace(',', ".").trim().parse::<f64>().ok()
}
