// ---------------------------------------------------------------------------
// Topic partition files
// ---------------------------------------------------------------------------
//
// One file per topic: `<data_dir>/<topic>.json`, holding a pretty-printed
// JSON array of records:
//
//   [
//     { "topic": "git", "question": "...", "answer": "...",
//       "weights": { "word": 1.0, ... } },
//     ...
//   ]
//
// Every save rewrites the whole file. With `atomic` set, the array is
// written to `.<topic>.json.tmp` first and renamed over the target.
// ---------------------------------------------------------------------------

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::error::QaError;
use crate::scoring::default_weights;
use crate::types::{QaEntry, StoredRecord};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PersistenceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Corruption: {0}")]
	Corruption(String),
	#[error("Serialization: {0}")]
	Serialization(String),
}

impl From<PersistenceError> for QaError {
	fn from(e: PersistenceError) -> Self {
		match e {
			PersistenceError::Io(io) => QaError::Io(io),
			PersistenceError::Corruption(msg) | PersistenceError::Serialization(msg) => {
				QaError::Serialization(msg)
			}
		}
	}
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const PARTITION_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = "tmp";
/// Leaves room for the `.` prefix and `.json.tmp` suffix within NAME_MAX.
const MAX_STEM_BYTES: usize = 240;

static TOPIC_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9_.-]{0,63}$").expect("valid topic regex"));

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Reject topic names that are not a plain file stem.
pub fn validate_topic(topic: &str) -> Result<(), QaError> {
	if TOPIC_PATTERN.is_match(topic) {
		Ok(())
	} else {
		Err(QaError::InvalidTopic(topic.to_string()))
	}
}

/// Reject topics that cannot name a partition file inside the data dir.
///
/// Looser than [`validate_topic`]: hand-written partitions may use topics
/// such as `Git Basics`, and those must round-trip through a save.
pub fn validate_stem(topic: &str) -> Result<(), QaError> {
	let unsafe_stem = topic.is_empty()
		|| topic.len() > MAX_STEM_BYTES
		|| topic.starts_with('.')
		|| topic.chars().any(|c| matches!(c, '/' | '\\') || c.is_control());
	if unsafe_stem {
		Err(QaError::InvalidTopic(topic.to_string()))
	} else {
		Ok(())
	}
}

pub fn partition_path(dir: &Path, topic: &str) -> PathBuf {
	dir.join(format!("{topic}.{PARTITION_EXTENSION}"))
}

fn temp_path(dir: &Path, topic: &str) -> PathBuf {
	dir.join(format!(".{topic}.{PARTITION_EXTENSION}.{TEMP_SUFFIX}"))
}

/// All partition files in `dir` as `(topic, path)`, sorted by file name.
///
/// A missing directory has no partitions. Hidden files and files with any
/// other extension are ignored.
pub fn list_partitions(dir: &Path) -> Result<Vec<(String, PathBuf)>, PersistenceError> {
	if !dir.exists() {
		return Ok(Vec::new());
	}

	let mut partitions = Vec::new();
	for dir_entry in std::fs::read_dir(dir)? {
		let path = dir_entry?.path();
		if !path.is_file() {
			continue;
		}
		if path.extension().and_then(|e| e.to_str()) != Some(PARTITION_EXTENSION) {
			continue;
		}
		let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
			continue;
		};
		if stem.starts_with('.') {
			continue;
		}
		partitions.push((stem.to_string(), path));
	}

	partitions.sort_by(|a, b| a.1.cmp(&b.1));
	Ok(partitions)
}

// ---------------------------------------------------------------------------
// Record codec
// ---------------------------------------------------------------------------

/// Parse a partition body. Anything other than an array of records is
/// corruption; there is no partial recovery.
pub fn decode_partition(bytes: &[u8]) -> Result<Vec<StoredRecord>, PersistenceError> {
	serde_json::from_slice(bytes).map_err(|e| PersistenceError::Corruption(e.to_string()))
}

pub fn encode_partition(records: &[StoredRecord]) -> Result<String, PersistenceError> {
	serde_json::to_string_pretty(records)
		.map_err(|e| PersistenceError::Serialization(format!("Failed to encode partition: {}", e)))
}

/// Turn a stored record into an in-memory entry.
///
/// A record without `topic` belongs to the partition it was read from; one
/// without `weights` gets the defaults for its question.
pub fn record_into_entry(record: StoredRecord, partition_topic: &str, id: String) -> QaEntry {
	let weights = record
		.weights
		.unwrap_or_else(|| default_weights(&record.question));
	QaEntry {
		id,
		topic: record.topic.unwrap_or_else(|| partition_topic.to_string()),
		question: record.question,
		answer: record.answer,
		weights,
	}
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

pub fn read_partition(path: &Path) -> Result<Vec<StoredRecord>, PersistenceError> {
	let bytes = std::fs::read(path)?;
	decode_partition(&bytes)
}

/// Read a partition for a read-modify-write cycle: a missing or unreadable
/// file counts as empty.
pub fn read_partition_or_empty(path: &Path) -> Vec<StoredRecord> {
	if !path.exists() {
		return Vec::new();
	}
	match read_partition(path) {
		Ok(records) => records,
		Err(e) => {
			tracing::warn!(path = %path.display(), error = %e, "Treating unreadable partition as empty");
			Vec::new()
		}
	}
}

/// Overwrite the partition for `topic` with exactly `records`.
pub fn write_partition(
	dir: &Path,
	topic: &str,
	records: &[StoredRecord],
	atomic: bool,
) -> Result<PathBuf, PersistenceError> {
	std::fs::create_dir_all(dir)?;

	let body = encode_partition(records)?;
	let path = partition_path(dir, topic);

	if atomic {
		let tmp = temp_path(dir, topic);
		if let Err(e) = std::fs::write(&tmp, &body).and_then(|_| std::fs::rename(&tmp, &path)) {
			let _ = std::fs::remove_file(&tmp);
			return Err(PersistenceError::Io(e));
		}
	} else {
		std::fs::write(&path, &body)?;
	}

	tracing::debug!(path = %path.display(), records = records.len(), "Wrote partition");
	Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
