//! Application state shared by the CLI and the daemon.
//!
//! `App` is an explicit value owned by whoever drives it: `main` for one-shot
//! commands, the daemon's router state for the HTTP API.

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::config::Config;
use crate::documents::{self, Document, DocumentError};
use crate::lock::FileLock;
use crate::semantic::{
    model_id_hash, EmbeddingModel, Embedder, EngineError, ScoredDocument, SearchEngine,
    SnapshotStorage, StorageError,
};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Documents(#[from] DocumentError),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Locked(std::io::Error),
}

/// How `load_or_build` got its corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Read from the saved snapshot
    Loaded,
    /// Embedded from the documents file and saved
    Built,
    /// Embedded from the documents file but not saved, another writer holds the lock
    BuiltUnsaved,
    /// Neither a snapshot nor a documents file exists
    Empty,
}

/// What is on disk at `index_file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    Missing,
    /// Written by the configured model in the current format
    Current,
    /// Written by another model or format version; the next load rebuilds it
    Stale,
    /// Unreadable; loading reports an error until it is rebuilt
    Corrupt,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub documents: usize,
    pub model: String,
    pub index_file: String,
    pub index: IndexState,
    pub documents_file: String,
    pub documents_file_exists: bool,
}

impl Status {
    /// Describe the saved index of `config` from its header alone, without
    /// loading the embedding model.
    pub fn from_saved_index(config: &Config) -> Self {
        let (index, saved_documents) = inspect_index(config, &model_id_hash(&config.model));

        Self::new(config, &config.model, index, saved_documents)
    }

    fn new(config: &Config, model: &str, index: IndexState, documents: usize) -> Self {
        let documents_path = config.documents_path();

        Self {
            documents,
            model: model.to_string(),
            index_file: config.index_path().display().to_string(),
            index,
            documents_file: documents_path.display().to_string(),
            documents_file_exists: documents_path.exists(),
        }
    }
}

/// Classify the snapshot at `index_file` and return its document count when
/// it is current.
fn inspect_index(config: &Config, model_id: &[u8; 32]) -> (IndexState, usize) {
    match SnapshotStorage::new(config.index_path()).inspect() {
        Ok(None) => (IndexState::Missing, 0),
        Ok(Some(info)) if info.model_id == *model_id => {
            (IndexState::Current, info.entry_count as usize)
        }
        Ok(Some(_)) | Err(StorageError::VersionMismatch(..)) => (IndexState::Stale, 0),
        Err(err) => {
            log::warn!("Saved index is unreadable: {}", err);
            (IndexState::Corrupt, 0)
        }
    }
}

pub struct App {
    config: Config,
    engine: SearchEngine,
    /// Serializes reindex + save within this process
    writer: Mutex<()>,
    /// Data directory lock held for the lifetime of the app (daemon, `index`)
    writer_lock: Option<FileLock>,
}

impl App {
    pub fn new(config: Config, model: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            engine: SearchEngine::new(model),
            writer: Mutex::new(()),
            writer_lock: None,
        }
    }

    /// Keep `lock` until the app is dropped; saves no longer take it per call.
    pub fn with_writer_lock(mut self, lock: FileLock) -> Self {
        self.writer_lock = Some(lock);
        self
    }

    /// Create the app with the fastembed model named in the config.
    pub fn with_default_model(config: Config) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.download_timeout_secs);
        let model = EmbeddingModel::new(
            &config.model,
            config.base_path().to_path_buf(),
            Some(timeout),
        )
        .map_err(EngineError::from)?;

        Ok(Self::new(config, Arc::new(model)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    /// Load the saved index, or build and save one from the documents file.
    ///
    /// A snapshot made by another model or format version is rebuilt from the
    /// documents file. A corrupt snapshot is reported, not silently replaced.
    pub fn load_or_build(&self) -> Result<LoadOutcome, AppError> {
        let index_path = self.config.index_path();

        match self.engine.load(&index_path) {
            Ok(true) => return Ok(LoadOutcome::Loaded),
            Ok(false) => log::info!("No existing index at {}", index_path.display()),
            Err(EngineError::Storage(
                err @ (StorageError::ModelMismatch
                | StorageError::VersionMismatch(..)
                | StorageError::DimensionMismatch { .. }),
            )) => {
                log::warn!("Saved index is stale ({}), rebuilding", err);
            }
            Err(err) => {
                log::error!("Failed to load index: {}", err);
                return Err(err.into());
            }
        }

        let documents_path = self.config.documents_path();
        if !documents_path.exists() {
            log::warn!(
                "No documents at {}, starting with an empty index",
                documents_path.display()
            );
            return Ok(LoadOutcome::Empty);
        }

        let documents = documents::load_documents(&documents_path)?;
        let _writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        match self.writer_lock() {
            Ok(_lock) => {
                self.index_and_save(documents)?;
                Ok(LoadOutcome::Built)
            }
            Err(AppError::Locked(err)) if err.kind() == io::ErrorKind::WouldBlock => {
                log::warn!("{}; using an in-memory index without saving it", err);
                self.engine.index(documents)?;
                Ok(LoadOutcome::BuiltUnsaved)
            }
            Err(err) => Err(err),
        }
    }

    /// Index `documents`, replacing the current corpus, and save the snapshot.
    ///
    /// Fails with `AppError::Locked` when another process holds the writer lock.
    pub fn reindex(&self, documents: Vec<Document>) -> Result<usize, AppError> {
        let _writer = self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let _lock = self.writer_lock()?;

        self.index_and_save(documents)
    }

    /// Reindex from a JSON documents file (the configured one by default).
    pub fn reindex_from_file(&self, path: Option<&Path>) -> Result<usize, AppError> {
        let default_path = self.config.documents_path();
        let path = path.unwrap_or(default_path.as_path());

        let documents = documents::load_documents(path)?;
        self.reindex(documents)
    }

    /// Search with the configured default result count unless `top_k` is given.
    pub fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<ScoredDocument>, AppError> {
        let top_k = top_k.unwrap_or(self.config.default_top_k);
        Ok(self.engine.search(query, top_k)?)
    }

    /// Status of the running app: the in-memory document count next to the
    /// state of the saved index.
    pub fn status(&self) -> Status {
        let model = self.engine.model_name();
        let (index, _) = inspect_index(&self.config, &model_id_hash(model));

        Status::new(&self.config, model, index, self.engine.len())
    }

    /// `None` when this app already holds the lock for its lifetime.
    fn writer_lock(&self) -> Result<Option<FileLock>, AppError> {
        if self.writer_lock.is_some() {
            return Ok(None);
        }

        FileLock::try_acquire(self.config.base_path())
            .map(Some)
            .map_err(AppError::Locked)
    }

    fn index_and_save(&self, documents: Vec<Document>) -> Result<usize, AppError> {
        self.engine.index(documents)?;
        self.engine.save(&self.config.index_path())?;

        Ok(self.engine.len())
    }
}
