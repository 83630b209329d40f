// ---------------------------------------------------------------------------
// Feedback Learner
// ---------------------------------------------------------------------------
//
// Explicit relevance feedback moves the weights of the query words on the
// judged entry by one step up or down, clamped to [WEIGHT_MIN, WEIGHT_MAX].
// A word the entry has no weight for starts from 1.0. After a batch the
// whole corpus is written back, one full partition rewrite per topic.
// ---------------------------------------------------------------------------

use crate::corpus::CorpusStore;
use crate::error::QaError;
use crate::types::{Feedback, Signal, Weights};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const WEIGHT_MIN: f64 = 0.2;
pub const WEIGHT_MAX: f64 = 4.0;
pub const WEIGHT_STEP: f64 = 0.2;
/// Starting point for a word that has no weight yet.
const UNSEEN_WEIGHT: f64 = 1.0;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LearningOptions {
	pub weight_step: f64,
	pub weight_min: f64,
	pub weight_max: f64,
}

impl Default for LearningOptions {
	fn default() -> Self {
		Self {
			weight_step: WEIGHT_STEP,
			weight_min: WEIGHT_MIN,
			weight_max: WEIGHT_MAX,
		}
	}
}

// ---------------------------------------------------------------------------
// FeedbackLearner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct FeedbackLearner {
	options: LearningOptions,
}

impl FeedbackLearner {
	pub fn new(options: LearningOptions) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &LearningOptions {
		&self.options
	}

	/// One step from `old` in the direction of `signal`, clamped.
	pub fn adjust(&self, old: f64, signal: Signal) -> f64 {
		(old + signal.delta() * self.options.weight_step)
			.clamp(self.options.weight_min, self.options.weight_max)
	}

	/// Adjust `weights` once per token occurrence; a repeated token moves
	/// twice.
	pub fn apply_to_weights<S: AsRef<str>>(&self, weights: &mut Weights, signal: Signal, tokens: &[S]) {
		for token in tokens {
			let token = token.as_ref().to_lowercase();
			let old = weights.get(&token).copied().unwrap_or(UNSEEN_WEIGHT);
			weights.insert(token, self.adjust(old, signal));
		}
	}

	/// Apply a feedback batch and write the corpus back.
	///
	/// Every target id is resolved before any weight moves, so an unknown id
	/// rejects the whole batch untouched.
	pub fn apply(&self, store: &mut CorpusStore, feedback: &[Feedback]) -> Result<(), QaError> {
		if feedback.is_empty() {
			return Ok(());
		}

		let targets = feedback
			.iter()
			.map(|fb| {
				store.position(&fb.entry_id).ok_or_else(|| {
					QaError::InvalidFeedbackTarget(format!("no entry with id {}", fb.entry_id))
				})
			})
			.collect::<Result<Vec<usize>, QaError>>()?;

		for (fb, index) in feedback.iter().zip(targets) {
			let entry = store.entry_mut(index);
			self.apply_to_weights(&mut entry.weights, fb.signal, &fb.query_tokens);
			tracing::debug!(
				id = %entry.id,
				topic = %entry.topic,
				signal = ?fb.signal,
				tokens = fb.query_tokens.len(),
				"Applied feedback"
			);
		}

		store.persist_all()
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
