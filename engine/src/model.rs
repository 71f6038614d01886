//! Core data model for checksum verification.
//!
//! This module defines the main data structures:
//! - Manifest, ManifestEntry: the list of expected (filename, digest) pairs
//! - Outcome: the terminal classification of one verification task
//! - TaskReport: the result attached to a finished task

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One expected checksum: a file name and the MD5 digest its contents
/// should hash to.
///
/// `filename` may be relative (resolved against a base directory at
/// submission time) or absolute. `data_checksum` is a lowercase 32-char
/// hex string; comparison against computed digests is byte-exact and
/// case-sensitive, so an ill-formed digest simply never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Path of the file to verify, relative or absolute
    pub filename: String,

    /// Expected MD5 digest of the file contents, lowercase hex
    pub data_checksum: String,
}

impl ManifestEntry {
    /// Create a new entry.
    pub fn new(filename: impl Into<String>, data_checksum: impl Into<String>) -> Self {
        ManifestEntry {
            filename: filename.into(),
            data_checksum: data_checksum.into(),
        }
    }

    /// Resolve this entry's filename against a base directory.
    ///
    /// Absolute filenames are returned unchanged.
    pub fn resolve_path(&self, base_dir: &Path) -> PathBuf {
        let path = Path::new(&self.filename);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Returns true if the expected digest looks like an MD5 hex string
    /// (exactly 32 lowercase hex characters).
    pub fn has_well_formed_digest(&self) -> bool {
        self.data_checksum.len() == 32
            && self
                .data_checksum
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

/// An ordered list of manifest entries.
///
/// Round-trips through JSON as `{"entries": [{"filename": ...,
/// "dataChecksum": ...}]}`. Loading and rendering this record is all the
/// persistence the engine does; how manifests get produced is the
/// caller's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Load a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Manifest, EngineError> {
        let raw = fs::read_to_string(path).map_err(|e| EngineError::ManifestRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| EngineError::ManifestParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the manifest to a JSON file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        // to_string_pretty only fails on non-string map keys; Manifest has none
        let raw = serde_json::to_string_pretty(self).map_err(|e| EngineError::ManifestParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, raw).map_err(|e| EngineError::ManifestWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Terminal classification of one verification task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Computed digest equals the expected digest
    Passed,
    /// File was read fully but the digests differ
    Failed,
    /// Target file did not exist when the task was scheduled
    Missing,
    /// The task observed a stop request before the file was fully read
    Cancelled,
    /// An unexpected open/stat/read fault occurred
    Errored,
}

impl Outcome {
    /// Returns true for outcomes representing an unexpected fault, as
    /// opposed to an expected business result.
    pub fn is_fault(&self) -> bool {
        matches!(self, Outcome::Errored)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Passed => write!(f, "Passed"),
            Outcome::Failed => write!(f, "Failed"),
            Outcome::Missing => write!(f, "Missing"),
            Outcome::Cancelled => write!(f, "Cancelled"),
            Outcome::Errored => write!(f, "Errored"),
        }
    }
}

/// The result attached to a finished verification task.
///
/// `digest` is the computed lowercase hex digest for Passed/Failed and a
/// human-readable placeholder for the other outcomes (see the constants
/// in `task`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// Position of the task in its batch
    pub index: usize,
    /// Terminal classification
    pub outcome: Outcome,
    /// Computed digest or placeholder text
    pub digest: String,
}
