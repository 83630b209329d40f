// ---------------------------------------------------------------------------
// QaEngine: corpus, synonyms and learner behind one owned value
// ---------------------------------------------------------------------------
//
// Queries borrow the engine shared; feedback and additions borrow it
// exclusively. Both front ends (REPL and JSON-RPC server) drive this type.
// ---------------------------------------------------------------------------

use std::path::PathBuf;

use crate::corpus::{CorpusStore, LoadReport, StoreConfig};
use crate::error::QaError;
use crate::learning::{FeedbackLearner, LearningOptions};
use crate::ranking;
use crate::synonyms::SynonymIndex;
use crate::types::{Feedback, Match, NewEntry, QaEntry};

/// Number of matches returned when the caller does not say.
pub const DEFAULT_TOP_N: usize = 5;

/// Library-level configuration. Built by the binary from CLI arguments.
#[derive(Debug, Clone)]
pub struct QaConfig {
	pub data_dir: PathBuf,
	pub top_n: usize,
	pub atomic_writes: bool,
	pub learning: LearningOptions,
}

impl Default for QaConfig {
	fn default() -> Self {
		let store = StoreConfig::default();
		Self {
			data_dir: store.data_dir,
			top_n: DEFAULT_TOP_N,
			atomic_writes: store.atomic_writes,
			learning: LearningOptions::default(),
		}
	}
}

impl QaConfig {
	pub fn store_config(&self) -> StoreConfig {
		StoreConfig {
			data_dir: self.data_dir.clone(),
			atomic_writes: self.atomic_writes,
		}
	}
}

pub struct QaEngine {
	store: CorpusStore,
	synonyms: SynonymIndex,
	learner: FeedbackLearner,
	top_n: usize,
}

impl QaEngine {
	pub fn new(store: CorpusStore, synonyms: SynonymIndex, learner: FeedbackLearner) -> Self {
		Self {
			store,
			synonyms,
			learner,
			top_n: DEFAULT_TOP_N,
		}
	}

	/// Open the data directory named by `config` and load it.
	pub fn open(config: &QaConfig, synonyms: SynonymIndex) -> Result<(Self, LoadReport), QaError> {
		let (store, report) = CorpusStore::open(config.store_config())?;
		for err in &report.corrupt {
			tracing::warn!(code = err.code(), "{}", err);
		}
		let mut engine = Self::new(store, synonyms, FeedbackLearner::new(config.learning.clone()));
		engine.top_n = config.top_n;
		Ok((engine, report))
	}

	/// Default result count for callers that do not pass one.
	pub fn top_n(&self) -> usize {
		self.top_n
	}

	/// Rank the corpus (optionally one topic only) against `query`.
	pub fn find_matches(&self, query: &str, top_n: usize, topic: Option<&str>) -> Vec<Match<'_>> {
		match topic {
			Some(topic) => ranking::find_matches(query, self.store.entries_in_topic(topic), top_n, &self.synonyms),
			None => ranking::find_matches(query, self.store.entries(), top_n, &self.synonyms),
		}
	}

	pub fn update_weights(&mut self, feedback: &[Feedback]) -> Result<(), QaError> {
		self.learner.apply(&mut self.store, feedback)
	}

	pub fn add_entry(&mut self, entry: NewEntry) -> Result<String, QaError> {
		self.store.add_entry(entry)
	}

	pub fn qa_list(&self) -> &[QaEntry] {
		self.store.entries()
	}

	pub fn store(&self) -> &CorpusStore {
		&self.store
	}

	pub fn synonyms(&self) -> &SynonymIndex {
		&self.synonyms
	}

	pub fn learner(&self) -> &FeedbackLearner {
		&self.learner
	}
}
