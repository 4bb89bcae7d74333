use std::path::PathBuf;

use clap::{ArgGroup, Args};
use edusync_core::{EngineError, Outcome};
use serde_json::Value;

use super::{build_engine, SetupError};
use crate::config::Config;

/// Add one record to the snapshot and sync it immediately
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "json"])))]
pub struct AddCommand {
    /// Collection name (e.g. students, programs, academic_terms)
    collection: String,

    /// Read the record from a JSON file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Record as inline JSON
    #[arg(long)]
    json: Option<String>,
}

impl AddCommand {
    pub async fn run(&self, config: &Config) -> Result<(), AddCommandError> {
        let record = self.read_record()?;
        let engine = build_engine(config)?;

        let outcome = engine.add_record(&self.collection, record).await?;
        match &outcome {
            Outcome::Created(id) => println!("✓ Created {} ({})", id, self.collection),
            Outcome::Updated(id) => println!("✓ Updated {} ({})", id, self.collection),
            Outcome::Skipped(reason) => println!("- Skipped: {}", reason),
            Outcome::Failed(reason) => return Err(AddCommandError::SyncFailed(reason.clone())),
        }
        Ok(())
    }

    fn read_record(&self) -> Result<Value, AddCommandError> {
        let text = match (&self.file, &self.json) {
            (Some(path), _) => std::fs::read_to_string(path)
                .map_err(|e| AddCommandError::ReadError(path.clone(), e))?,
            (None, Some(json)) => json.clone(),
            (None, None) => return Err(AddCommandError::NoRecord),
        };
        let record: Value = serde_json::from_str(&text).map_err(AddCommandError::InvalidJson)?;
        if !record.is_object() {
            return Err(AddCommandError::NotAnObject);
        }
        Ok(record)
    }
}

/// Errors from the add command
#[derive(Debug)]
pub enum AddCommandError {
    ReadError(PathBuf, std::io::Error),
    InvalidJson(serde_json::Error),
    NotAnObject,
    NoRecord,
    Setup(SetupError),
    Engine(EngineError),
    SyncFailed(String),
}

impl std::fmt::Display for AddCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddCommandError::ReadError(path, e) => {
                write!(f, "Failed to read '{}': {}", path.display(), e)
            }
            AddCommandError::InvalidJson(e) => write!(f, "Invalid JSON: {}", e),
            AddCommandError::NotAnObject => write!(f, "Record must be a JSON object"),
            AddCommandError::NoRecord => write!(f, "Provide a record with --file or --json"),
            AddCommandError::Setup(e) => write!(f, "{}", e),
            AddCommandError::Engine(e) => write!(f, "{}", e),
            AddCommandError::SyncFailed(reason) => {
                write!(f, "Record saved locally but not synced: {}", reason)
            }
        }
    }
}

impl std::error::Error for AddCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AddCommandError::ReadError(_, e) => Some(e),
            AddCommandError::InvalidJson(e) => Some(e),
            AddCommandError::Setup(e) => Some(e),
            AddCommandError::Engine(e) => Some(e),
            AddCommandError::NotAnObject
            | AddCommandError::NoRecord
            | AddCommandError::SyncFailed(_) => None,
        }
    }
}

impl From<SetupError> for AddCommandError {
    fn from(e: SetupError) -> Self {
        AddCommandError::Setup(e)
    }
}

impl From<EngineError> for AddCommandError {
    fn from(e: EngineError) -> Self {
        AddCommandError::Engine(e)
    }
}
