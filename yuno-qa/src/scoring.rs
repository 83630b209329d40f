// ---------------------------------------------------------------------------
// Scoring: weighted term overlap with synonym expansion
// ---------------------------------------------------------------------------

use crate::synonyms::SynonymIndex;
use crate::types::{QaEntry, Weights};

/// Weight assigned to every question word of a new entry.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Lowercase and split on whitespace. Punctuation is kept and repeated
/// tokens are not collapsed.
pub fn tokenize(text: &str) -> Vec<String> {
	text.split_whitespace().map(str::to_lowercase).collect()
}

/// Default weights for a question: [`DEFAULT_WEIGHT`] per distinct token.
pub fn default_weights(question: &str) -> Weights {
	tokenize(question)
		.into_iter()
		.map(|token| (token, DEFAULT_WEIGHT))
		.collect()
}

/// Relevance of `entry` for a raw query string.
pub fn score(query: &str, entry: &QaEntry, synonyms: &SynonymIndex) -> f64 {
	score_tokens(&tokenize(query), entry, synonyms)
}

/// Relevance of `entry` for already tokenized (lowercase) query words.
///
/// Each token contributes its own weight plus the weight of each listed
/// synonym; words the entry has no weight for contribute 0.
pub fn score_tokens<S: AsRef<str>>(tokens: &[S], entry: &QaEntry, synonyms: &SynonymIndex) -> f64 {
	let weight = |word: &str| entry.weights.get(word).copied().unwrap_or(0.0);

	tokens
		.iter()
		.map(|token| {
			let token = token.as_ref();
			weight(token)
				+ synonyms
					.lookup(token)
					.iter()
					.map(|syn| weight(syn.as_str()))
					.sum::<f64>()
		})
		.sum()
}
