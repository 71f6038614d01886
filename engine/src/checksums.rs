//! Streaming MD5 computation.
//!
//! This module provides:
//! - ChecksumReader: chunk-at-a-time file hashing with a running byte count
//! - pick_chunk_size: the randomized per-task chunk-size policy
//!
//! The reader never holds more than one chunk in memory, so arbitrarily
//! large files verify in constant space.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::EngineError;

/// MD5 digest of zero bytes; the expected digest of any empty file.
pub const EMPTY_DIGEST: &str = "d41d8cd98f00b204e9800998ecf8427e";

/// Files at or above this size use the large chunk-size class.
pub const LARGE_FILE_THRESHOLD: u64 = 1024 * 1024 * 1024;

/// Pick a chunk size for one task.
///
/// Drawn pseudo-randomly once per task: 32 to 128 KiB for files under
/// 1 GiB, 256 KiB to 1 MiB at or above. Fewer, larger reads for big
/// files; finer progress granularity for small ones. The draw has no
/// correctness impact, it only changes how many progress events a
/// consumer observes, so progress-event counts are non-deterministic.
pub fn pick_chunk_size(total_size: u64) -> usize {
    let mut rng = rand::thread_rng();
    let kib = if total_size >= LARGE_FILE_THRESHOLD {
        rng.gen_range(256..=1024)
    } else {
        rng.gen_range(32..=128)
    };
    kib * 1024
}

/// Reads a file chunk by chunk, folding every chunk into an MD5
/// accumulator.
///
/// Callers drive the loop: each `read_chunk` consumes up to one chunk and
/// reports the total bytes read so far, `Ok(None)` signals end of file,
/// and `finalize_hex` yields the digest. Stopping early is simply a
/// matter of not calling `read_chunk` again and dropping the reader; the
/// partial digest state is discarded, never trusted.
pub struct ChecksumReader {
    path: PathBuf,
    file: File,
    context: md5::Context,
    buffer: Vec<u8>,
    bytes_read: u64,
}

impl ChecksumReader {
    /// Open `path` for streaming with the given chunk size.
    pub fn open(path: &Path, chunk_size: usize) -> Result<ChecksumReader, EngineError> {
        let file = File::open(path).map_err(|e| EngineError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(ChecksumReader {
            path: path.to_path_buf(),
            file,
            context: md5::Context::new(),
            buffer: vec![0u8; chunk_size],
            bytes_read: 0,
        })
    }

    /// Read and fold the next chunk.
    ///
    /// Returns the total bytes read so far after this chunk, or `Ok(None)`
    /// at end of file. A chunk is folded completely or not at all; a
    /// failed read leaves the accumulator unusable, which is fine because
    /// the caller abandons the reader on error.
    pub fn read_chunk(&mut self) -> Result<Option<u64>, EngineError> {
        let n = self.file.read(&mut self.buffer).map_err(|e| EngineError::Read {
            path: self.path.clone(),
            source: e,
        })?;

        if n == 0 {
            return Ok(None);
        }

        self.context.consume(&self.buffer[..n]);
        self.bytes_read += n as u64;
        Ok(Some(self.bytes_read))
    }

    /// Total bytes folded into the digest so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Consume the reader and return the lowercase hex digest of
    /// everything read.
    pub fn finalize_hex(self) -> String {
        format!("{:x}", self.context.compute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn read_to_end(reader: &mut ChecksumReader) {
        while reader.read_chunk().expect("Failed to read chunk").is_some() {}
    }

    #[test]
    fn test_known_digest() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").expect("Failed to write file");

        let mut reader = ChecksumReader::open(&path, 64 * 1024).expect("Failed to open reader");
        read_to_end(&mut reader);
        assert_eq!(reader.bytes_read(), 5);
        assert_eq!(reader.finalize_hex(), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_empty_file_digest() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("empty.bin");
        std::fs::File::create(&path).expect("Failed to create file");

        let mut reader = ChecksumReader::open(&path, 4096).expect("Failed to open reader");
        assert!(reader.read_chunk().expect("Failed to read chunk").is_none());
        assert_eq!(reader.bytes_read(), 0);
        assert_eq!(reader.finalize_hex(), EMPTY_DIGEST);
    }

    #[test]
    fn test_chunked_digest_matches_one_shot() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("data.bin");

        // Content larger than the chunk size so several chunks are folded
        let content: Vec<u8> = (0..10_000u32).flat_map(|i| i.to_le_bytes()).collect();
        let mut file = std::fs::File::create(&path).expect("Failed to create file");
        file.write_all(&content).expect("Failed to write file");
        drop(file);

        let mut reader = ChecksumReader::open(&path, 1024).expect("Failed to open reader");
        read_to_end(&mut reader);
        assert_eq!(reader.bytes_read(), content.len() as u64);
        assert_eq!(
            reader.finalize_hex(),
            format!("{:x}", md5::compute(&content))
        );
    }

    #[test]
    fn test_byte_count_is_cumulative() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("data.bin");
        std::fs::write(&path, vec![7u8; 2500]).expect("Failed to write file");

        let mut reader = ChecksumReader::open(&path, 1000).expect("Failed to open reader");
        let mut counts = Vec::new();
        while let Some(read) = reader.read_chunk().expect("Failed to read chunk") {
            counts.push(read);
        }

        assert!(
            counts.windows(2).all(|w| w[0] < w[1]),
            "byte counts must strictly increase: {:?}",
            counts
        );
        assert_eq!(*counts.last().expect("no chunks read"), 2500);
    }

    #[test]
    fn test_open_missing_file() {
        let result = ChecksumReader::open(Path::new("/nonexistent/file.bin"), 4096);
        assert!(matches!(result, Err(EngineError::Open { .. })));
    }

    #[test]
    fn test_chunk_size_classes() {
        for _ in 0..50 {
            let small = pick_chunk_size(1);
            assert!(
                (32 * 1024..=128 * 1024).contains(&small),
                "small-file chunk out of range: {}",
                small
            );
            assert_eq!(small % 1024, 0);

            let large = pick_chunk_size(LARGE_FILE_THRESHOLD);
            assert!(
                (256 * 1024..=1024 * 1024).contains(&large),
                "large-file chunk out of range: {}",
                large
            );
            assert_eq!(large % 1024, 0);
        }
    }
}
