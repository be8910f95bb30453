//! Report extraction.

use cerberus_core::{AnalysisResult, CerberusError, Result};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Read and validate the report at `path`
///
/// Fails with `OutputMissing` when there is no file, `MalformedOutput` when it
/// is not a regular file holding a JSON object of the expected shape, and
/// `IncompleteResult` when it lacks the required sections.
///
/// Symlinks, FIFOs and device nodes are rejected before anything is opened,
/// so a report path the engine left in a strange state cannot block the read.
pub async fn extract(path: &Path) -> Result<AnalysisResult> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CerberusError::OutputMissing {
                path: path.display().to_string(),
            });
        }
        Err(e) => return Err(CerberusError::io(path, e)),
    };
    if !metadata.is_file() {
        return Err(CerberusError::MalformedOutput(format!(
            "report at {} is {}, not a regular file",
            path.display(),
            file_type(&metadata.file_type())
        )));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CerberusError::io(path, e))?;

    let result = parse_report(&bytes)?;
    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        sections = result.section_analysis.as_ref().map_or(0, Vec::len),
        "extracted report"
    );
    Ok(result)
}

/// Parse and validate report bytes
pub fn parse_report(bytes: &[u8]) -> Result<AnalysisResult> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CerberusError::MalformedOutput(format!("not valid JSON: {e}")))?;

    if !value.is_object() {
        return Err(CerberusError::MalformedOutput(format!(
            "expected a JSON object, found {}",
            json_type(&value)
        )));
    }

    let result: AnalysisResult = serde_json::from_value(value)
        .map_err(|e| CerberusError::MalformedOutput(e.to_string()))?;
    result.validate()?;
    Ok(result)
}

fn file_type(file_type: &std::fs::FileType) -> &'static str {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if file_type.is_fifo() {
            return "a FIFO";
        }
        if file_type.is_socket() {
            return "a socket";
        }
        if file_type.is_block_device() || file_type.is_char_device() {
            return "a device";
        }
    }

    if file_type.is_symlink() {
        "a symlink"
    } else if file_type.is_dir() {
        "a directory"
    } else {
        "not a regular file"
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
