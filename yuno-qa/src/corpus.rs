// ---------------------------------------------------------------------------
// CorpusStore: the authoritative in-memory corpus
// ---------------------------------------------------------------------------
//
// Owns every loaded entry, in load order (partition file name, then record
// order inside the file), followed by entries added this session. All writes
// to disk go through here, one topic partition at a time.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::QaError;
use crate::learning::{WEIGHT_MAX, WEIGHT_MIN};
use crate::persistence::{self, PersistenceError};
use crate::scoring::{DEFAULT_WEIGHT, tokenize};
use crate::types::{NewEntry, QaEntry, StoredRecord, TopicInfo, Weights};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a `CorpusStore`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
	pub data_dir: PathBuf,
	/// Write partitions to a temp file and rename over the target.
	pub atomic_writes: bool,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			data_dir: PathBuf::from("data_qa"),
			atomic_writes: true,
		}
	}
}

/// Outcome of a corpus load.
#[derive(Debug, Default)]
pub struct LoadReport {
	/// Partitions that parsed.
	pub partitions: usize,
	pub entries: usize,
	/// One `QaError::CorruptPartition` per partition that contributed nothing.
	pub corrupt: Vec<QaError>,
}

// ---------------------------------------------------------------------------
// CorpusStore
// ---------------------------------------------------------------------------

pub struct CorpusStore {
	config: StoreConfig,
	entries: Vec<QaEntry>,
	/// Partitions that parsed at load, so a full rewrite can empty the ones
	/// whose entries all live under other topics.
	loaded_partitions: Vec<String>,
}

fn new_id() -> String {
	Uuid::new_v4().to_string()
}

impl CorpusStore {
	// -- Lifecycle -----------------------------------------------------------

	/// An empty store over `config.data_dir`; nothing is read yet.
	pub fn new(config: StoreConfig) -> Self {
		Self {
			config,
			entries: Vec::new(),
			loaded_partitions: Vec::new(),
		}
	}

	/// Create the data directory if needed and load every partition in it.
	pub fn open(config: StoreConfig) -> Result<(Self, LoadReport), QaError> {
		std::fs::create_dir_all(&config.data_dir)?;
		let mut store = Self::new(config);
		let report = store.load()?;
		Ok((store, report))
	}

	/// Replace the in-memory corpus with what is on disk.
	///
	/// A partition that fails to read or parse, or that names a topic which
	/// cannot be a partition file, contributes zero entries and is reported in
	/// [`LoadReport::corrupt`]; the rest still load. Entry ids are fresh after
	/// every load.
	pub fn load(&mut self) -> Result<LoadReport, QaError> {
		let partitions = persistence::list_partitions(&self.config.data_dir)?;
		let mut report = LoadReport::default();
		let mut entries = Vec::new();
		let mut loaded = Vec::new();

		for (topic, path) in partitions {
			let parsed = persistence::read_partition(&path).map_err(|e| match e {
				PersistenceError::Io(io) => io.to_string(),
				PersistenceError::Corruption(msg) | PersistenceError::Serialization(msg) => msg,
			});
			let parsed = parsed.and_then(|records| {
				let bad = records
					.iter()
					.map(|r| r.topic.as_deref().unwrap_or(topic.as_str()))
					.find(|t| persistence::validate_stem(t).is_err());
				match bad {
					Some(bad) => Err(format!("unusable topic name {bad:?}")),
					None => Ok(records),
				}
			});

			match parsed {
				Ok(records) => {
					report.partitions += 1;
					loaded.push(topic.clone());
					entries.extend(
						records
							.into_iter()
							.map(|r| persistence::record_into_entry(r, &topic, new_id())),
					);
				}
				Err(reason) => {
					report.corrupt.push(QaError::CorruptPartition { topic, reason });
				}
			}
		}

		report.entries = entries.len();
		self.entries = entries;
		self.loaded_partitions = loaded;

		tracing::info!(
			dir = %self.config.data_dir.display(),
			partitions = report.partitions,
			entries = report.entries,
			corrupt = report.corrupt.len(),
			"Loaded corpus"
		);
		Ok(report)
	}

	// -- Mutation ------------------------------------------------------------

	/// Validate, persist and append a new entry. Returns its id.
	///
	/// The partition file is re-read (missing or corrupt counts as empty),
	/// the record appended, and the file rewritten. Nothing changes in
	/// memory or on disk if validation fails. Identical entries may be added
	/// more than once.
	pub fn add_entry(&mut self, new: NewEntry) -> Result<String, QaError> {
		let topic = new.topic.trim();
		if topic.is_empty() {
			return Err(QaError::MissingRequiredField("topic"));
		}
		if new.question.trim().is_empty() {
			return Err(QaError::MissingRequiredField("question"));
		}
		if new.answer.trim().is_empty() {
			return Err(QaError::MissingRequiredField("answer"));
		}
		persistence::validate_topic(topic)?;

		let weights = match new.weights {
			Some(supplied) if !supplied.is_empty() => complete_weights(&new.question, supplied)?,
			_ => crate::scoring::default_weights(&new.question),
		};

		let entry = QaEntry {
			id: new_id(),
			topic: topic.to_string(),
			question: new.question,
			answer: new.answer,
			weights,
		};

		let path = persistence::partition_path(&self.config.data_dir, &entry.topic);
		let mut records = persistence::read_partition_or_empty(&path);
		records.push(StoredRecord::from(&entry));
		let written = persistence::write_partition(
			&self.config.data_dir,
			&entry.topic,
			&records,
			self.config.atomic_writes,
		)?;
		tracing::info!(path = %written.display(), id = %entry.id, "Saved new entry");

		let id = entry.id.clone();
		self.entries.push(entry);
		Ok(id)
	}

	/// Overwrite the partition for `topic` with exactly `entries`.
	///
	/// Accepts any topic that can name a file, including ones that came from
	/// disk and would not pass the stricter check on `add_entry`.
	pub fn save_topic<'a, I>(&self, topic: &str, entries: I) -> Result<(), QaError>
	where
		I: IntoIterator<Item = &'a QaEntry>,
	{
		persistence::validate_stem(topic)?;
		let records: Vec<StoredRecord> = entries.into_iter().map(StoredRecord::from).collect();
		persistence::write_partition(
			&self.config.data_dir,
			topic,
			&records,
			self.config.atomic_writes,
		)?;
		Ok(())
	}

	/// Rewrite every topic partition from the in-memory corpus.
	///
	/// A partition read at load whose records all carry another topic is
	/// rewritten empty, so those records are not loaded twice next time.
	pub fn persist_all(&self) -> Result<(), QaError> {
		let groups = self.group_by_topic();
		for (topic, entries) in &groups {
			self.save_topic(topic, entries.iter().copied())?;
		}
		for stale in &self.loaded_partitions {
			if !groups.iter().any(|(topic, _)| *topic == stale.as_str()) {
				self.save_topic(stale, std::iter::empty())?;
			}
		}
		tracing::debug!(topics = groups.len(), entries = self.entries.len(), "Persisted corpus");
		Ok(())
	}

	pub(crate) fn position(&self, id: &str) -> Option<usize> {
		self.entries.iter().position(|e| e.id == id)
	}

	pub(crate) fn entry_mut(&mut self, index: usize) -> &mut QaEntry {
		&mut self.entries[index]
	}

	// -- Read access ---------------------------------------------------------

	pub fn entries(&self) -> &[QaEntry] {
		&self.entries
	}

	pub fn entries_in_topic<'a, 't>(&'a self, topic: &'t str) -> impl Iterator<Item = &'a QaEntry> {
		self.entries.iter().filter(move |e| e.topic == topic)
	}

	pub fn get(&self, id: &str) -> Option<&QaEntry> {
		self.entries.iter().find(|e| e.id == id)
	}

	/// Topics in order of first appearance, with entry counts.
	pub fn topics(&self) -> Vec<TopicInfo> {
		self.group_by_topic()
			.into_iter()
			.map(|(topic, entries)| TopicInfo {
				topic: topic.to_string(),
				entry_count: entries.len(),
			})
			.collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn data_dir(&self) -> &Path {
		&self.config.data_dir
	}

	// -- Helpers -------------------------------------------------------------

	fn group_by_topic(&self) -> Vec<(&str, Vec<&QaEntry>)> {
		let mut slots: HashMap<&str, usize> = HashMap::new();
		let mut groups: Vec<(&str, Vec<&QaEntry>)> = Vec::new();
		for entry in &self.entries {
			let slot = *slots.entry(entry.topic.as_str()).or_insert_with(|| {
				groups.push((entry.topic.as_str(), Vec::new()));
				groups.len() - 1
			});
			groups[slot].1.push(entry);
		}
		groups
	}
}

/// Normalize manually supplied weights: lowercase keys, reject non-finite
/// values and keys that differ only by case, clamp into range, and give
/// unlisted question words the default.
fn complete_weights(question: &str, supplied: Weights) -> Result<Weights, QaError> {
	let mut weights = Weights::new();
	for (word, value) in supplied {
		if !value.is_finite() {
			return Err(QaError::InvalidWeightInput(format!("{word}={value}")));
		}
		let key = word.to_lowercase();
		if weights.insert(key, value.clamp(WEIGHT_MIN, WEIGHT_MAX)).is_some() {
			return Err(QaError::InvalidWeightInput(format!(
				"{word} is listed more than once (words are case-insensitive)"
			)));
		}
	}
	for token in tokenize(question) {
		weights.entry(token).or_insert(DEFAULT_WEIGHT);
	}
	Ok(weights)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	fn config(dir: &Path) -> StoreConfig {
		StoreConfig {
			data_dir: dir.to_path_buf(),
			..Default::default()
		}
	}

	fn new_entry(topic: &str, question: &str, answer: &str) -> NewEntry {
		NewEntry {
			topic: topic.into(),
			question: question.into(),
			answer: answer.into(),
			weights: None,
		}
	}

	#[test]
	fn open_creates_missing_dir() {
		let parent = tempfile::tempdir().unwrap();
		let dir = parent.path().join("a").join("b");
		let (store, report) = CorpusStore::open(config(&dir)).unwrap();
		assert!(dir.is_dir());
		assert!(store.is_empty());
		assert_eq!(report.partitions, 0);
	}

	#[test]
	fn add_derives_default_weights() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		let id = store.add_entry(new_entry("git", "Create new Repo", "git init")).unwrap();

		let entry = store.get(&id).unwrap();
		assert_eq!(entry.weights.len(), 3);
		assert_eq!(entry.weights["create"], 1.0);
		assert_eq!(entry.weights["repo"], 1.0);
	}

	#[test]
	fn add_then_reload_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		let mut supplied = Weights::new();
		supplied.insert("repo".into(), 3.0);
		let id = store
			.add_entry(NewEntry {
				topic: "git".into(),
				question: "create new repo".into(),
				answer: "git init\\nthen commit".into(),
				weights: Some(supplied),
			})
			.unwrap();
		let original = store.get(&id).unwrap().clone();

		let (reloaded, report) = CorpusStore::open(config(dir.path())).unwrap();
		assert_eq!(report.entries, 1);
		let back = &reloaded.entries()[0];
		assert_eq!(back.topic, original.topic);
		assert_eq!(back.question, original.question);
		assert_eq!(back.answer, original.answer);
		assert_eq!(back.weights, original.weights);
		assert_ne!(back.id, original.id);
	}

	#[test]
	fn supplied_weights_are_completed_and_clamped() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		let mut supplied = Weights::new();
		supplied.insert("Repo".into(), 9.0);
		supplied.insert("new".into(), 0.0);
		let id = store
			.add_entry(NewEntry {
				topic: "git".into(),
				question: "create new repo".into(),
				answer: "git init".into(),
				weights: Some(supplied),
			})
			.unwrap();

		let w = &store.get(&id).unwrap().weights;
		assert_eq!(w["repo"], WEIGHT_MAX);
		assert_eq!(w["new"], WEIGHT_MIN);
		assert_eq!(w["create"], DEFAULT_WEIGHT);
	}

	#[test]
	fn case_colliding_weights_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		let mut supplied = Weights::new();
		supplied.insert("Repo".into(), 3.0);
		supplied.insert("repo".into(), 1.0);
		let err = store
			.add_entry(NewEntry {
				weights: Some(supplied),
				..new_entry("git", "create repo", "git init")
			})
			.unwrap_err();
		assert_eq!(err.code(), "QA_INVALID_WEIGHT");
		assert!(store.is_empty());
	}

	#[test]
	fn empty_weights_fall_back_to_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		let id = store
			.add_entry(NewEntry {
				weights: Some(Weights::new()),
				..new_entry("git", "push branch", "git push")
			})
			.unwrap();
		assert_eq!(store.get(&id).unwrap().weights.len(), 2);
	}

	#[test]
	fn missing_fields_rejected_without_side_effects() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();

		let cases = [
			(new_entry("", "q", "a"), "topic"),
			(new_entry("git", "  ", "a"), "question"),
			(new_entry("git", "q", ""), "answer"),
		];
		for (entry, field) in cases {
			match store.add_entry(entry) {
				Err(QaError::MissingRequiredField(f)) => assert_eq!(f, field),
				other => panic!("expected missing {field}, got {other:?}"),
			}
		}
		assert!(store.is_empty());
		assert!(persistence::list_partitions(dir.path()).unwrap().is_empty());
	}

	#[test]
	fn unsafe_topic_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		let err = store.add_entry(new_entry("../escape", "q", "a")).unwrap_err();
		assert_eq!(err.code(), "QA_INVALID_TOPIC");
		assert!(store.is_empty());
	}

	#[test]
	fn non_finite_weight_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		let mut supplied = Weights::new();
		supplied.insert("q".into(), f64::NAN);
		let err = store
			.add_entry(NewEntry {
				weights: Some(supplied),
				..new_entry("git", "q", "a")
			})
			.unwrap_err();
		assert_eq!(err.code(), "QA_INVALID_WEIGHT");
		assert!(store.is_empty());
	}

	#[test]
	fn duplicates_are_allowed() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		store.add_entry(new_entry("git", "push", "git push")).unwrap();
		store.add_entry(new_entry("git", "push", "git push")).unwrap();
		assert_eq!(store.len(), 2);

		let on_disk = persistence::read_partition(&dir.path().join("git.json")).unwrap();
		assert_eq!(on_disk.len(), 2);
	}

	#[test]
	fn add_appends_to_existing_partition_on_disk() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("git.json"),
			r#"[{"topic": "git", "question": "push", "answer": "git push"}]"#,
		)
		.unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		store.add_entry(new_entry("git", "pull", "git pull")).unwrap();

		let on_disk = persistence::read_partition(&dir.path().join("git.json")).unwrap();
		let questions: Vec<_> = on_disk.iter().map(|r| r.question.as_str()).collect();
		assert_eq!(questions, ["push", "pull"]);
	}

	#[test]
	fn add_over_corrupt_partition_starts_fresh() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("git.json"), "{truncated").unwrap();
		let (mut store, report) = CorpusStore::open(config(dir.path())).unwrap();
		assert_eq!(report.corrupt.len(), 1);

		store.add_entry(new_entry("git", "pull", "git pull")).unwrap();
		let on_disk = persistence::read_partition(&dir.path().join("git.json")).unwrap();
		assert_eq!(on_disk.len(), 1);
	}

	#[test]
	fn load_skips_corrupt_partitions_and_reports_them() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("good.json"),
			r#"[{"topic": "good", "question": "a b", "answer": "x"}]"#,
		)
		.unwrap();
		std::fs::write(
			dir.path().join("bad.json"),
			r#"[{"topic": "bad", "question": "c", "answer": "y"}, {"#,
		)
		.unwrap();

		let (store, report) = CorpusStore::open(config(dir.path())).unwrap();
		assert_eq!(store.len(), 1);
		assert_eq!(report.partitions, 1);
		assert_eq!(report.corrupt.len(), 1);
		match &report.corrupt[0] {
			QaError::CorruptPartition { topic, .. } => assert_eq!(topic, "bad"),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn load_reports_partition_with_unusable_topic() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("sneaky.json"),
			r#"[{"topic": "../escape", "question": "q", "answer": "a"}]"#,
		)
		.unwrap();
		std::fs::write(
			dir.path().join("fine.json"),
			r#"[{"topic": "Fine Topic", "question": "q", "answer": "a"}]"#,
		)
		.unwrap();

		let (store, report) = CorpusStore::open(config(dir.path())).unwrap();
		assert_eq!(store.len(), 1);
		assert_eq!(store.entries()[0].topic, "Fine Topic");
		match &report.corrupt[..] {
			[QaError::CorruptPartition { topic, reason }] => {
				assert_eq!(topic, "sneaky");
				assert!(reason.contains("../escape"));
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn persist_all_moves_records_into_their_topic_file() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("git.json"),
			r#"[{"topic": "Git Basics", "question": "push", "answer": "git push"}]"#,
		)
		.unwrap();

		let (store, _) = CorpusStore::open(config(dir.path())).unwrap();
		store.persist_all().unwrap();

		assert!(persistence::read_partition(&dir.path().join("git.json")).unwrap().is_empty());
		let moved = persistence::read_partition(&dir.path().join("Git Basics.json")).unwrap();
		assert_eq!(moved.len(), 1);

		let (reloaded, _) = CorpusStore::open(config(dir.path())).unwrap();
		assert_eq!(reloaded.len(), 1);
	}

	#[test]
	fn load_defaults_missing_weights_and_topic() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("docker.json"),
			r#"[{"question": "Build Image", "answer": "docker build ."}]"#,
		)
		.unwrap();

		let (store, _) = CorpusStore::open(config(dir.path())).unwrap();
		let entry = &store.entries()[0];
		assert_eq!(entry.topic, "docker");
		assert_eq!(entry.weights["build"], 1.0);
		assert_eq!(entry.weights["image"], 1.0);
	}

	#[test]
	fn load_order_follows_file_names() {
		let dir = tempfile::tempdir().unwrap();
		for topic in ["zeta", "alpha", "mid"] {
			std::fs::write(
				dir.path().join(format!("{topic}.json")),
				format!(r#"[{{"topic": "{topic}", "question": "q", "answer": "a"}}]"#),
			)
			.unwrap();
		}
		let (store, _) = CorpusStore::open(config(dir.path())).unwrap();
		let topics: Vec<_> = store.entries().iter().map(|e| e.topic.as_str()).collect();
		assert_eq!(topics, ["alpha", "mid", "zeta"]);
	}

	#[test]
	fn save_topic_replaces_partition() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		store.add_entry(new_entry("git", "push", "git push")).unwrap();
		store.add_entry(new_entry("git", "pull", "git pull")).unwrap();

		let keep: Vec<&QaEntry> = store.entries().iter().filter(|e| e.question == "pull").collect();
		store.save_topic("git", keep).unwrap();

		let on_disk = persistence::read_partition(&dir.path().join("git.json")).unwrap();
		assert_eq!(on_disk.len(), 1);
		assert_eq!(on_disk[0].question, "pull");
	}

	#[test]
	fn topics_and_topic_filter() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		store.add_entry(new_entry("git", "push", "a")).unwrap();
		store.add_entry(new_entry("docker", "build", "b")).unwrap();
		store.add_entry(new_entry("git", "pull", "c")).unwrap();

		let topics = store.topics();
		assert_eq!(
			topics,
			vec![
				TopicInfo { topic: "git".into(), entry_count: 2 },
				TopicInfo { topic: "docker".into(), entry_count: 1 },
			]
		);
		assert_eq!(store.entries_in_topic("git").count(), 2);
		assert_eq!(store.entries_in_topic("none").count(), 0);
	}

	#[test]
	fn persist_all_writes_each_topic() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(config(dir.path())).unwrap();
		store.add_entry(new_entry("git", "push", "a")).unwrap();
		store.add_entry(new_entry("docker", "build", "b")).unwrap();
		for name in ["git.json", "docker.json"] {
			std::fs::remove_file(dir.path().join(name)).unwrap();
		}

		store.persist_all().unwrap();
		let (reloaded, _) = CorpusStore::open(config(dir.path())).unwrap();
		assert_eq!(reloaded.len(), 2);
	}

	#[test]
	fn non_atomic_writes_also_persist() {
		let dir = tempfile::tempdir().unwrap();
		let (mut store, _) = CorpusStore::open(StoreConfig {
			data_dir: dir.path().to_path_buf(),
			atomic_writes: false,
		})
		.unwrap();
		store.add_entry(new_entry("git", "push", "a")).unwrap();
		assert!(dir.path().join("git.json").exists());
	}
}
