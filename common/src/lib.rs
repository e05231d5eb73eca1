//! Shared plumbing for the devignette workspace: record serialization,
//! deterministic fingerprints and process-level logging setup.

pub mod file_format;
pub mod fnv;
pub mod log_setup;

pub use file_format::{FileExtensionError, FileFormat, FileFormatResult};

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum SerdeFormatError {
    #[error("YAML serialization failed")]
    Yaml(#[from] serde_yml::Error),
    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),
}

pub type SerdeFormatResult<T> = Result<T, SerdeFormatError>;

/// Serializes `value` into a text record, ending with a newline.
pub fn serialize<T: Serialize>(value: &T, format: FileFormat) -> SerdeFormatResult<String> {
    let mut text = match format {
        FileFormat::Yaml => serde_yml::to_string(value)?,
        FileFormat::Json => serde_json::to_string_pretty(value)?,
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

pub fn deserialize<T: DeserializeOwned>(
    serialized: &str,
    format: FileFormat,
) -> SerdeFormatResult<T> {
    match format {
        FileFormat::Yaml => Ok(serde_yml::from_str(serialized)?),
        FileFormat::Json => Ok(serde_json::from_str(serialized)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        center: (f32, f32),
        gains: Vec<f32>,
    }

    fn record() -> Record {
        Record {
            center: (320.5, 240.0),
            gains: vec![1.0, 0.98, 0.91],
        }
    }

    #[test]
    fn test_yaml_and_json_restore_the_record() {
        for format in [FileFormat::Yaml, FileFormat::Json] {
            let text = serialize(&record(), format).unwrap();
            assert!(text.ends_with('\n'));
            let restored: Record = deserialize(&text, format).unwrap();
            assert_eq!(restored, record());
        }
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let err = deserialize::<Record>("{ not json", FileFormat::Json).unwrap_err();
        assert!(matches!(err, SerdeFormatError::Json(_)));
    }
}
