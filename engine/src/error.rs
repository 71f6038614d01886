//! Error types for the verification engine.
//!
//! The primary error type is `EngineError`, which represents faults that
//! make a single file unverifiable (open/stat/read failures) or a manifest
//! unusable. Expected business outcomes (a digest mismatch, a missing
//! file, a user-requested stop) are not errors; they are terminal task
//! outcomes (see `model::Outcome`).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Faults raised while verifying a file or loading a manifest.
///
/// Task-level faults (`Open`, `Metadata`, `Read`) are fully contained
/// within the failing task: they surface through that task's error event
/// and the pool's error collection, and never abort sibling tasks.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Failed to open the target file for reading
    #[error("failed to open {}: {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file metadata (size)
    #[error("failed to stat {}: {}", .path.display(), .source)]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed while reading file contents
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read a manifest file from disk
    #[error("failed to read manifest {}: {}", .path.display(), .source)]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Manifest file exists but does not parse as manifest JSON
    #[error("manifest {} is not valid: {}", .path.display(), .source)]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write a manifest file to disk
    #[error("failed to write manifest {}: {}", .path.display(), .source)]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_path() {
        let err = EngineError::Open {
            path: PathBuf::from("/tmp/data.bin"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("/tmp/data.bin"), "got: {}", rendered);
        assert!(rendered.contains("denied"), "got: {}", rendered);
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error;

        let err = EngineError::Read {
            path: PathBuf::from("x"),
            source: io::Error::new(io::ErrorKind::Other, "boom"),
        };
        assert!(err.source().is_some(), "io::Error source should be chained");
    }
}
