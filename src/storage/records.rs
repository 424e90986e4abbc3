//! JSON Lines record files
//!
//! Every store keeps its data as one JSON record per line. Appends are flushed
//! and synced before returning; whole-file rewrites go through a temp file and
//! an atomic rename so a crash never leaves a half-written record set.

use crate::error::{RatingError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Ordered set of `T` records stored in a single `.jsonl` file
#[derive(Debug, Clone)]
pub struct RecordFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> RecordFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read all records, or `None` if the file does not exist
    pub fn read_existing(&self) -> Result<Option<Vec<T>>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RatingError::io(&self.path, e)),
        };

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| RatingError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record =
                serde_json::from_str(&line).map_err(|e| RatingError::CorruptedRecord {
                    path: self.path.clone(),
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            records.push(record);
        }

        Ok(Some(records))
    }

    /// Read all records; a missing file is an empty record set
    pub fn read_all(&self) -> Result<Vec<T>> {
        Ok(self.read_existing()?.unwrap_or_default())
    }

    /// Create the file holding a single first record. Returns `false` without
    /// touching anything if the file already exists.
    pub fn create_new(&self, first: &T) -> Result<bool> {
        self.ensure_parent()?;

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(RatingError::io(&self.path, e)),
        };

        let line = encode_line(first)?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| RatingError::io(&self.path, e))?;

        tracing::debug!("Created record file {}", self.path.display());
        Ok(true)
    }

    /// Append one record, creating the file if needed
    pub fn append(&self, record: &T) -> Result<()> {
        self.ensure_parent()?;

        let line = encode_line(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RatingError::io(&self.path, e))?;

        file.write_all(line.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|e| RatingError::io(&self.path, e))?;

        tracing::debug!("Appended record to {}", self.path.display());
        Ok(())
    }

    /// Replace the whole record set
    pub fn rewrite(&self, records: &[T]) -> Result<()> {
        self.ensure_parent()?;

        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&encode_line(record)?);
        }

        let temp_path = self.path.with_extension("jsonl.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| RatingError::io(&temp_path, e))?;
        file.write_all(buffer.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| RatingError::io(&temp_path, e))?;

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(|e| RatingError::io(&self.path, e))?;

        tracing::debug!(
            "Rewrote {} with {} records",
            self.path.display(),
            records.len()
        );
        Ok(())
    }

    /// Delete the file. Returns `false` if it did not exist.
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RatingError::io(&self.path, e)),
        }
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| RatingError::io(parent, e))?;
        }
        Ok(())
    }
}

fn encode_line<T: Serialize>(record: &T) -> Result<String> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}
