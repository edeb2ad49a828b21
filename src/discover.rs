use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::errors::BenchError;
use crate::types::{Event, ModelDir, ModelName};

/// Line (0-indexed) and field of the cell count in a topology descriptor.
const CELL_COUNT_LINE: usize = 6;
const CELL_COUNT_FIELD: usize = 1;

/// List the model directories directly under `models_dir`, sorted by name.
///
/// Plain files are ignored, as is any directory in `excluded` (typically the
/// results directory when it lives under the models root).
pub fn discover_models(models_dir: &Path, excluded: &[PathBuf]) -> Result<Vec<ModelDir>> {
    if !models_dir.is_dir() {
        return Err(BenchError::ModelsDirNotFound {
            path: models_dir.to_path_buf(),
        }
        .into());
    }

    let excluded: Vec<PathBuf> = excluded
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();

    let mut models = Vec::new();
    for entry in std::fs::read_dir(models_dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        if let Ok(canonical) = path.canonicalize()
            && excluded.contains(&canonical)
        {
            log::debug!("Skipping excluded directory {}", path.display());
            continue;
        }

        let dir_name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };

        models.push(ModelDir { dir_name, path });
    }

    models.sort_by(|a, b| a.dir_name.cmp(&b.dir_name));
    Ok(models)
}

/// Decode `<prefix>_<basin>_<scale>_<scenario>[_...]`.
pub fn parse_model_name(name: &str) -> Result<ModelName, BenchError> {
    let parts: Vec<&str> = name.split('_').collect();
    if parts.len() < 4 {
        return Err(BenchError::InvalidModelName {
            name: name.to_string(),
        });
    }

    Ok(ModelName {
        basin: parts[1].to_uppercase(),
        scale: replace_scale(parts[2]),
        scenario: parts[3].to_uppercase(),
        id: format!("{}_{}_{}", parts[1], parts[2], parts[3]),
    })
}

/// Map a scale code to its cell size in metres. Unknown codes pass through.
pub fn replace_scale(code: &str) -> String {
    match code {
        "1k" => "1000",
        "2p5" => "2500",
        "5k" => "5000",
        "30m" => "30",
        "200m" => "200",
        "500m" => "500",
        other => other,
    }
    .to_string()
}

/// List the event files of a model, sorted by id.
///
/// The event directory is created when missing so the model can be filled
/// later; it then simply yields no events.
pub fn discover_events(model_dir: &Path, event_dir: &str, extension: &str) -> Result<Vec<Event>> {
    let dir = model_dir.join(event_dir);
    if !dir.is_dir() {
        log::debug!("Creating missing event directory {}", dir.display());
        std::fs::create_dir_all(&dir)?;
    }

    let mut events = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let (Some(stem), Some(file_name)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.file_name().and_then(|s| s.to_str()),
        ) else {
            continue;
        };

        events.push(Event {
            id: stem.to_string(),
            relative_path: format!("{}/{}", event_dir, file_name),
        });
    }

    events.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(events)
}

/// Read the basin cell count from a topology descriptor.
pub fn read_cell_count(path: &Path) -> Result<u64, BenchError> {
    let parse_err = |detail: String| BenchError::TopologyParse {
        path: path.to_path_buf(),
        detail,
    };

    let file = std::fs::File::open(path).map_err(|e| parse_err(e.to_string()))?;
    let line = BufReader::new(file)
        .lines()
        .nth(CELL_COUNT_LINE)
        .ok_or_else(|| parse_err(format!("fewer than {} lines", CELL_COUNT_LINE + 1)))?
        .map_err(|e| parse_err(e.to_string()))?;

    let field = line
        .split_whitespace()
        .nth(CELL_COUNT_FIELD)
        .ok_or_else(|| {
            parse_err(format!(
                "line {} has no field {}",
                CELL_COUNT_LINE + 1,
                CELL_COUNT_FIELD
            ))
        })?;

    field
        .parse::<u64>()
        .map_err(|e| parse_err(format!("'{}' is not a cell count: {}", field, e)))
}
