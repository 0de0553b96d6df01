//! Append-only storage for finished trajectories.
//!
//! A store is a JSON-lines file: one header line naming the format version,
//! then one line per [`TrajectoryRecord`]. Records are appended as each
//! episode finishes; earlier lines are never rewritten.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use uuid::Uuid;

use crate::trajectory::TrajectoryRecord;

const FORMAT: &str = "trajopt-records";
const VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {source}")]
    Format {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is not a trajectory store ({reason})")]
    Header { path: PathBuf, reason: String },

    #[error("record {id} would not load back from {path}: {reason}")]
    Unreadable { path: PathBuf, id: Uuid, reason: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    format: String,
    version: u32,
}

#[derive(Debug)]
pub struct TrajectoryStore {
    path: PathBuf,
    out: BufWriter<File>,
    records: usize,
}

impl TrajectoryStore {
    /// Creates (or truncates) a store at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| io_error(&path, source))?;
        let mut store = Self {
            path,
            out: BufWriter::new(file),
            records: 0,
        };
        let header = Header {
            format: FORMAT.to_string(),
            version: VERSION,
        };
        store.write_line(&header)?;
        Ok(store)
    }

    /// Opens an existing store for appending, or creates it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Self::create(path);
        }
        let records = read_lines(&path)?.count();
        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| io_error(&path, source))?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Appends one record. The encoded line is parsed back first; a record that
    /// would not load (non-finite values) is rejected and nothing is written.
    pub fn append<S>(&mut self, record: &TrajectoryRecord<S>) -> Result<(), PersistError>
    where
        S: Serialize + DeserializeOwned,
    {
        let line = self.encode(record)?;
        if let Err(err) = serde_json::from_str::<TrajectoryRecord<S>>(&line) {
            return Err(PersistError::Unreadable {
                path: self.path.clone(),
                id: record.id(),
                reason: err.to_string(),
            });
        }
        self.write_raw(&line)?;
        self.records += 1;
        tracing::debug!(path = %self.path.display(), records = self.records, id = %record.id(), "record appended");
        Ok(())
    }

    /// Reads every record, in the order they were appended.
    pub fn load<S: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<TrajectoryRecord<S>>, PersistError> {
        let path = path.as_ref();
        read_lines(path)?
            .map(|(line, text)| {
                serde_json::from_str(&text).map_err(|source| PersistError::Format {
                    path: path.to_path_buf(),
                    line,
                    source,
                })
            })
            .collect()
    }

    fn write_line<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PersistError> {
        let line = self.encode(value)?;
        self.write_raw(&line)
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, PersistError> {
        serde_json::to_string(value).map_err(|source| PersistError::Format {
            path: self.path.clone(),
            line: self.records + 2,
            source,
        })
    }

    fn write_raw(&mut self, line: &str) -> Result<(), PersistError> {
        writeln!(self.out, "{line}")
            .and_then(|_| self.out.flush())
            .map_err(|source| io_error(&self.path, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistError {
    PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Validates the header and yields `(line number, text)` for every record line.
fn read_lines(path: &Path) -> Result<impl Iterator<Item = (usize, String)>, PersistError> {
    let file = File::open(path).map_err(|source| io_error(path, source))?;
    let mut lines = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| io_error(path, source))?;
        if !line.trim().is_empty() {
            lines.push((i + 1, line));
        }
    }

    let mut lines = lines.into_iter();
    let header_error = |reason: String| PersistError::Header {
        path: path.to_path_buf(),
        reason,
    };
    let (_, first) = lines.next().ok_or_else(|| header_error("empty file".into()))?;
    let header: Header = serde_json::from_str(&first).map_err(|e| header_error(e.to_string()))?;
    if header.format != FORMAT || header.version != VERSION {
        return Err(header_error(format!("found {} v{}", header.format, header.version)));
    }
    Ok(lines)
}
