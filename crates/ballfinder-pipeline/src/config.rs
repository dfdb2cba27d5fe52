//! Copy-on-write parameter store with dotted-path updates.
//!
//! Workers take one [`Arc<Parameters>`] snapshot per frame with a lock-free
//! load. Writers serialize on a mutex, clone the current snapshot, apply every
//! change, validate the result and swap the pointer only when everything
//! succeeded, so a reader never observes a partially applied update.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use ballfinder_detect::{Parameters, ParamsError, ParamsIoError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unknown parameter key `{0}`")]
    UnknownKey(String),
    #[error("invalid value for `{key}`: {source}")]
    TypeMismatch {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed update `{0}` (expected key=value)")]
    MalformedUpdate(String),
    #[error(transparent)]
    Invalid(#[from] ParamsError),
    #[error(transparent)]
    Io(#[from] ParamsIoError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("parameter store has no backing file")]
    NoBackingFile,
}

/// One `{key, value}` change addressed by a dotted path such as
/// `color.red1.lower.h`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub key: String,
    pub value: Value,
}

impl ParameterUpdate {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse `key=value`; the value is read as JSON when possible, otherwise
    /// as a bare string (`strategy=circle`).
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedUpdate(raw.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::MalformedUpdate(raw.to_string()));
        }
        let value = value.trim();
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        Ok(Self::new(key, value))
    }
}

/// Wire form of an update request: a single update or a list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateRequest {
    One(ParameterUpdate),
    Many(Vec<ParameterUpdate>),
}

impl UpdateRequest {
    pub fn into_updates(self) -> Vec<ParameterUpdate> {
        match self {
            UpdateRequest::One(u) => vec![u],
            UpdateRequest::Many(us) => us,
        }
    }
}

fn set_by_path(doc: &mut Value, key: &str, value: Value) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownKey(key.to_string());
    let mut node = doc;
    let mut segments = key.split('.').peekable();
    while let Some(segment) = segments.next() {
        let obj = node.as_object_mut().ok_or_else(unknown)?;
        let child = obj.get_mut(segment).ok_or_else(unknown)?;
        if segments.peek().is_none() {
            *child = value;
            return Ok(());
        }
        node = child;
    }
    Err(unknown())
}

/// Apply `updates` to a copy of `base`, returning the validated result.
pub fn apply_to(base: &Parameters, updates: &[ParameterUpdate]) -> Result<Parameters, ConfigError> {
    let mut doc = serde_json::to_value(base)?;
    for update in updates {
        set_by_path(&mut doc, &update.key, update.value.clone())?;
        serde_json::from_value::<Parameters>(doc.clone()).map_err(|source| {
            ConfigError::TypeMismatch {
                key: update.key.clone(),
                source,
            }
        })?;
    }
    let next: Parameters = serde_json::from_value(doc)?;
    next.validate()?;
    Ok(next)
}

/// Shared holder of the current parameter snapshot.
#[derive(Debug)]
pub struct ParameterStore {
    current: ArcSwap<Parameters>,
    writer: Mutex<()>,
    path: Option<PathBuf>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::with_params(Parameters::default(), None)
    }
}

impl ParameterStore {
    fn with_params(params: Parameters, path: Option<PathBuf>) -> Self {
        Self {
            current: ArcSwap::from_pointee(params),
            writer: Mutex::new(()),
            path,
        }
    }

    /// In-memory store holding validated `params`.
    pub fn new(params: Parameters) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self::with_params(params, None))
    }

    /// Store backed by a JSON file.
    ///
    /// A missing file is created with defaults. A malformed or invalid file is
    /// logged and replaced in memory by defaults; the file is left untouched.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let params = if path.exists() {
            match Parameters::load_json(&path) {
                Ok(p) => match p.validate() {
                    Ok(()) => p,
                    Err(err) => {
                        log::warn!("{}: {err}; using defaults", path.display());
                        Parameters::default()
                    }
                },
                Err(err) => {
                    log::warn!("{}: {err}; using defaults", path.display());
                    Parameters::default()
                }
            }
        } else {
            log::info!("{} not found; writing defaults", path.display());
            let defaults = Parameters::default();
            defaults.write_json(&path)?;
            defaults
        };
        Ok(Self::with_params(params, Some(path)))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current snapshot. Never blocks, even while an update is being applied.
    pub fn snapshot(&self) -> Arc<Parameters> {
        self.current.load_full()
    }

    /// Apply all `updates` or none of them.
    pub fn apply_updates(&self, updates: &[ParameterUpdate]) -> Result<Arc<Parameters>, ConfigError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(apply_to(&self.current.load(), updates)?);
        self.current.store(Arc::clone(&next));
        log::info!("applied {} parameter update(s)", updates.len());
        Ok(next)
    }

    /// Apply a wire-format request (`{"key", "value"}` or a list of them).
    pub fn apply_json(&self, raw: &str) -> Result<Arc<Parameters>, ConfigError> {
        let request: UpdateRequest = serde_json::from_str(raw)?;
        self.apply_updates(&request.into_updates())
    }

    /// Swap in a whole new snapshot after validating it.
    pub fn replace(&self, params: Parameters) -> Result<(), ConfigError> {
        params.validate()?;
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.current.store(Arc::new(params));
        Ok(())
    }

    /// Write the current snapshot to the backing file.
    pub fn persist(&self) -> Result<(), ConfigError> {
        let path = self.path.as_ref().ok_or(ConfigError::NoBackingFile)?;
        self.persist_to(path)
    }

    pub fn persist_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.snapshot().write_json(path)?;
        Ok(())
    }
}
