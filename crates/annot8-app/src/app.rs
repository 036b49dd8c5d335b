//! Application configuration and the top-level run loop.

use crate::replay::Replayer;
use crate::script::ReplayScript;
use annot8_core::config::{ConfigError, EngineConfig};
use annot8_core::notes::NotesError;
use annot8_core::session::IntakeError;
use annot8_core::storage::StorageError;
use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Invalid(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid script: {0}")]
    Script(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("File rejected: {0}")]
    Intake(#[from] IntakeError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Notes error: {0}")]
    Notes(#[from] NotesError),
}

pub type AppResult<T> = Result<T, AppError>;

/// Command-line configuration.
#[derive(Debug, Clone, Default, PartialEq, Parser)]
#[command(name = "annot8")]
#[command(about = "Replay an annotation script and print the resulting document")]
pub struct AppConfig {
    /// Replay script (JSON).
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,
    /// Engine configuration (JSON); defaults apply to missing fields.
    #[arg(long = "config", value_name = "FILE")]
    pub engine_config: Option<PathBuf>,
    /// Pretty-print the output document.
    #[arg(long)]
    pub pretty: bool,
}

impl AppConfig {
    /// Engine configuration from `--config`, or the defaults.
    pub fn load_engine_config(&self) -> AppResult<EngineConfig> {
        match &self.engine_config {
            Some(path) => {
                let config = EngineConfig::from_json(&read_file(path)?)?;
                log::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            None => Ok(EngineConfig::default()),
        }
    }

    pub fn load_script(&self) -> AppResult<ReplayScript> {
        Ok(serde_json::from_str(&read_file(&self.script)?)?)
    }
}

fn read_file(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Replay the configured script and render the result as JSON.
pub fn run(config: &AppConfig) -> AppResult<String> {
    let engine_config = config.load_engine_config()?;
    let script = config.load_script()?;
    let output = Replayer::new(engine_config).replay(&script)?;
    let json = if config.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Result<AppConfig, clap::Error> {
        AppConfig::try_parse_from(std::iter::once("annot8").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let config = parse(&["s.json", "--config", "c.json", "--pretty"]).unwrap();
        assert_eq!(config.script, PathBuf::from("s.json"));
        assert_eq!(config.engine_config, Some(PathBuf::from("c.json")));
        assert!(config.pretty);

        let config = parse(&["--config=c.json", "s.json"]).unwrap();
        assert_eq!(config.engine_config, Some(PathBuf::from("c.json")));
        assert!(!config.pretty);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["s.json", "--config"]).is_err());
        assert!(parse(&["a", "b"]).is_err());
        assert!(parse(&["a", "--verbose"]).is_err());
    }

    #[test]
    fn test_engine_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"save_debounce_ms": 250}}"#).unwrap();
        let config = AppConfig {
            script: PathBuf::from("unused.json"),
            engine_config: Some(file.path().to_path_buf()),
            pretty: false,
        };
        let engine = config.load_engine_config().unwrap();
        assert_eq!(engine.save_debounce_ms, 250);
        assert_eq!(engine.resync_debounce_ms, 100);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            script: dir.path().join("missing.json"),
            ..Default::default()
        };
        assert!(matches!(config.load_script(), Err(AppError::Io { .. })));
    }

    #[test]
    fn test_run_script_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "file": {{"name": "paper.pdf"}},
                "pages": 2,
                "steps": [
                    {{"at_ms": 0, "command": {{"type": "select_tool", "tool": "rectangle"}}}},
                    {{"at_ms": 50, "command": {{"type": "edit_notes", "text": "see [page:2]"}}}}
                ]
            }}"#
        )
        .unwrap();
        let config = AppConfig {
            script: file.path().to_path_buf(),
            ..Default::default()
        };
        let json: serde_json::Value = serde_json::from_str(&run(&config).unwrap()).unwrap();
        assert_eq!(json["notes"], "see [page:2]");
        assert_eq!(json["document"]["1"]["objects"].as_array().unwrap().len(), 1);
    }
}
