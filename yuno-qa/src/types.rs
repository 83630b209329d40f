use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-word relevance weights of one entry.
pub type Weights = BTreeMap<String, f64>;

/// One question/answer record held by the corpus.
///
/// `id` is assigned when the entry enters memory (load or add) and is never
/// written to disk, so ids from before a reload do not resolve afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaEntry {
	pub id: String,
	pub topic: String,
	pub question: String,
	pub answer: String,
	pub weights: Weights,
}

/// The persisted shape of an entry inside a topic partition file.
///
/// `topic` and `weights` are optional on read only; hand-written partitions
/// often omit them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
	#[serde(default)]
	pub topic: Option<String>,
	pub question: String,
	#[serde(default)]
	pub answer: String,
	#[serde(default)]
	pub weights: Option<Weights>,
}

impl From<&QaEntry> for StoredRecord {
	fn from(entry: &QaEntry) -> Self {
		Self {
			topic: Some(entry.topic.clone()),
			question: entry.question.clone(),
			answer: entry.answer.clone(),
			weights: Some(entry.weights.clone()),
		}
	}
}

/// Input for `add_entry`. Absent or empty `weights` are derived from the
/// question.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewEntry {
	#[serde(default)]
	pub topic: String,
	#[serde(default)]
	pub question: String,
	#[serde(default)]
	pub answer: String,
	#[serde(default)]
	pub weights: Option<Weights>,
}

/// Direction of a feedback adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
	/// `+1`: the result was relevant.
	Reinforce,
	/// `-1`: the result was not relevant.
	Weaken,
}

impl Signal {
	pub fn delta(self) -> f64 {
		match self {
			Self::Reinforce => 1.0,
			Self::Weaken => -1.0,
		}
	}

	/// Parse the REPL symbols `+` / `-`.
	pub fn from_symbol(symbol: &str) -> Option<Self> {
		match symbol {
			"+" => Some(Self::Reinforce),
			"-" => Some(Self::Weaken),
			_ => None,
		}
	}

	/// Parse the wire values `1` / `-1`.
	pub fn from_i64(value: i64) -> Option<Self> {
		match value {
			1 => Some(Self::Reinforce),
			-1 => Some(Self::Weaken),
			_ => None,
		}
	}
}

/// Feedback on one entry for the words of one past query.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
	pub entry_id: String,
	pub signal: Signal,
	pub query_tokens: Vec<String>,
}

/// A ranked result borrowing its entry from the corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
	/// Score as a share of the best qualifying score, one decimal place.
	pub percentage: f64,
	pub score: f64,
	pub entry: &'a QaEntry,
}

/// Wire form of a [`Match`] returned by the query endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
	pub id: String,
	pub topic: String,
	pub question: String,
	pub answer: String,
	#[serde(rename = "match")]
	pub percentage: f64,
}

impl From<&Match<'_>> for MatchView {
	fn from(m: &Match<'_>) -> Self {
		Self {
			id: m.entry.id.clone(),
			topic: m.entry.topic.clone(),
			question: m.entry.question.clone(),
			answer: m.entry.answer.clone(),
			percentage: m.percentage,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicInfo {
	pub topic: String,
	#[serde(rename = "entryCount")]
	pub entry_count: usize,
}
