//! Persisted dictionary and model artifacts.
//!
//! Both files are written through a temporary sibling and renamed into place,
//! dictionary first and model last. Any earlier model is deleted before the new
//! dictionary lands. The model file is the readiness signal: if it exists, the
//! pair is complete.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::dictionary::VocabularyDictionary;
use crate::embeddings::EmbeddingModel;
use crate::error::{EngineError, Result};

/// Default dictionary file name.
pub const DEFAULT_DICTIONARY_FILE: &str = "vocabulary.dict";
/// Default model file name.
pub const DEFAULT_MODEL_FILE: &str = "embeddings.model";

/// On-disk locations of the artifact pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// JSON dictionary artifact.
    pub dictionary: PathBuf,
    /// Binary embedding model artifact.
    pub model: PathBuf,
}

impl ArtifactPaths {
    /// Uses the default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            dictionary: dir.join(DEFAULT_DICTIONARY_FILE),
            model: dir.join(DEFAULT_MODEL_FILE),
        }
    }

    /// True when a model artifact exists, which implies a complete pair.
    pub fn is_ready(&self) -> bool {
        self.model.is_file()
    }
}

/// The in-memory result of one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifacts {
    /// Token ↔ id mapping.
    pub dictionary: VocabularyDictionary,
    /// Trained vectors.
    pub model: EmbeddingModel,
}

impl ModelArtifacts {
    /// Writes the dictionary, then the model.
    ///
    /// Any previous model is removed first, so an interrupted write never
    /// leaves a new dictionary next to an old model.
    pub fn persist(&self, paths: &ArtifactPaths) -> Result<()> {
        retire_model(&paths.model)?;
        self.write_dictionary(&paths.dictionary)?;
        self.write_model(&paths.model)?;
        info!(
            dictionary = %paths.dictionary.display(),
            model = %paths.model.display(),
            "model artifacts written"
        );
        Ok(())
    }

    fn write_dictionary(&self, path: &Path) -> Result<()> {
        write_atomic(path, |writer| {
            serde_json::to_writer(writer, &self.dictionary).map_err(|err| err.to_string())
        })
    }

    fn write_model(&self, path: &Path) -> Result<()> {
        write_atomic(path, |writer| {
            bincode::serialize_into(writer, &self.model).map_err(|err| err.to_string())
        })
    }

    /// Reads both artifacts back.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let dictionary: VocabularyDictionary = read_with(&paths.dictionary, |reader| {
            serde_json::from_reader(reader).map_err(|err| err.to_string())
        })?;
        let model: EmbeddingModel = read_with(&paths.model, |reader| {
            bincode::deserialize_from(reader).map_err(|err| err.to_string())
        })?;
        if let Some(missing) = model.words().iter().find(|word| dictionary.id(word).is_none()) {
            warn!(
                token = %missing,
                "model token missing from dictionary; artifacts may come from different runs"
            );
        }
        info!(
            tokens = dictionary.len(),
            words = model.len(),
            dimensions = model.dimensions(),
            "model artifacts loaded"
        );
        Ok(Self { dictionary, model })
    }
}

fn retire_model(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(model = %path.display(), "previous model artifact removed");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(EngineError::artifact_io(path, err)),
    }
}

fn write_atomic<F>(path: &Path, encode: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> std::result::Result<(), String>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|err| EngineError::artifact_io(&dir, err))?;
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|err| EngineError::artifact_io(path, err))?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        encode(&mut writer).map_err(|message| EngineError::artifact_format(path, message))?;
        writer
            .flush()
            .map_err(|err| EngineError::artifact_io(path, err))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|err| EngineError::artifact_io(path, err))?;
    tmp.persist(path)
        .map_err(|err| EngineError::artifact_io(path, err.error))?;
    Ok(())
}

fn read_with<T, F>(path: &Path, decode: F) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce(BufReader<File>) -> std::result::Result<T, String>,
{
    let file = File::open(path).map_err(|err| EngineError::artifact_io(path, err))?;
    decode(BufReader::new(file)).map_err(|message| EngineError::artifact_format(path, message))
}
