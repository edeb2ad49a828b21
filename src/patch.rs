//! Rewrites the control-parameter file the model executables read.
//!
//! The file is positional: the model directory lives on the first line and
//! the event file on the sixth. Nothing else in the file is touched.

use std::path::Path;

use anyhow::{Context, Result};

use crate::errors::BenchError;

const MODEL_PATH_LINE: usize = 0;
const EVENT_FILE_LINE: usize = 5;

/// The named fields of the control file this tool owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPatch {
    pub model_path: String,
    pub event_file: Option<String>,
}

impl ControlPatch {
    /// Patch for a model directory, written with a trailing `/` because the
    /// executables append file names directly to it.
    pub fn for_model(model_dir: &Path) -> Self {
        let mut model_path = model_dir.to_string_lossy().into_owned();
        if !model_path.ends_with('/') && !model_path.ends_with('\\') {
            model_path.push('/');
        }
        ControlPatch {
            model_path,
            event_file: None,
        }
    }

    pub fn with_event(mut self, event_file: impl Into<String>) -> Self {
        self.event_file = Some(event_file.into());
        self
    }
}

/// Apply `patch` to the raw control file. `path` is only used for errors.
///
/// Lines this tool does not own come back byte for byte, whatever their
/// encoding.
pub fn apply_patch(
    contents: &[u8],
    patch: &ControlPatch,
    path: &Path,
) -> Result<Vec<u8>, BenchError> {
    let mut lines: Vec<Vec<u8>> = contents
        .split_inclusive(|&b| b == b'\n')
        .map(<[u8]>::to_vec)
        .collect();
    let line_count = lines.len();

    let mut fields = vec![("model_path", MODEL_PATH_LINE, patch.model_path.as_str())];
    if let Some(event_file) = &patch.event_file {
        fields.push(("event_file", EVENT_FILE_LINE, event_file.as_str()));
    }

    for (field, line, value) in fields {
        let Some(existing) = lines.get_mut(line) else {
            return Err(BenchError::ControlFileTooShort {
                path: path.to_path_buf(),
                field,
                line: line + 1,
                lines: line_count,
            });
        };
        let mut replaced = value.as_bytes().to_vec();
        replaced.extend_from_slice(line_ending(existing));
        *existing = replaced;
    }

    Ok(lines.concat())
}

/// Patch `original` and write the same bytes to both `original` and `working_copy`.
pub fn patch_control_files(
    original: &Path,
    working_copy: &Path,
    patch: &ControlPatch,
) -> Result<()> {
    let contents = std::fs::read(original)
        .with_context(|| format!("Failed to read control file {}", original.display()))?;

    let patched = apply_patch(&contents, patch, original)?;

    std::fs::write(working_copy, &patched)
        .with_context(|| format!("Failed to write {}", working_copy.display()))?;
    std::fs::write(original, &patched)
        .with_context(|| format!("Failed to write {}", original.display()))?;

    Ok(())
}

fn line_ending(line: &[u8]) -> &'static [u8] {
    if line.ends_with(b"\r\n") {
        b"\r\n"
    } else {
        // The last line may lack a terminator; the executables expect one.
        b"\n"
    }
}
