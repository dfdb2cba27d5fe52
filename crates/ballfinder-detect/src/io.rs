//! JSON persistence for [`Parameters`].

use std::fs;
use std::path::Path;

use crate::Parameters;

#[derive(thiserror::Error, Debug)]
pub enum ParamsIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Parameters {
    /// Load parameters from a JSON file; missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ParamsIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write parameters to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ParamsIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
