use std::{
    io::{self, Write},
    path::PathBuf,
};

use serde::Serialize;
use tracing::trace;

#[derive(Debug, thiserror::Error)]
pub enum ResultWriterError {
    #[error("JSON Serialization error {error}")]
    SerializeJson { error: serde_json::Error },

    #[error("Failed to write to stdout: {error}")]
    Stdout { error: io::Error },

    #[error("Failed to write to file: {error}")]
    FileWrite { error: io::Error },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataDestination {
    Stdout,
    Json { file: PathBuf },
}

pub struct ResultWriter;
impl ResultWriter {
    #[tracing::instrument(skip(result))]
    pub fn write<T: Serialize>(dest: DataDestination, result: &T) -> Result<(), ResultWriterError> {
        let json = serde_json::to_string_pretty(result)
            .map_err(|error| ResultWriterError::SerializeJson { error })?;

        match dest {
            DataDestination::Stdout => {
                trace!(bytes_len = json.len(), "Writing json to stdout");

                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(json.as_bytes())
                    .and_then(|_| stdout.write_all(b"\n"))
                    .map_err(|error| ResultWriterError::Stdout { error })?;
                Ok(())
            }
            DataDestination::Json { file } => {
                trace!(
                    bytes_len = json.len(),
                    destination = ?file,
                    "Writing json"
                );

                std::fs::write(file, json)
                    .map_err(|error| ResultWriterError::FileWrite { error })?;

                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    #[test]
    fn json_file_destination() {
        let file = std::env::temp_dir().join(format!(
            "map-feature-generator-{}-result.json",
            std::process::id()
        ));

        ResultWriter::write(
            DataDestination::Json { file: file.clone() },
            &json!({"tile_count": 2}),
        )
        .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        fs::remove_file(&file).unwrap();
        assert_eq!(written["tile_count"], 2);
    }

    #[test]
    fn unwritable_file_is_reported() {
        let result = ResultWriter::write(
            DataDestination::Json {
                file: PathBuf::from("/nonexistent/dir/report.json"),
            },
            &json!({}),
        );

        assert!(matches!(result, Err(ResultWriterError::FileWrite { .. })));
    }
}
