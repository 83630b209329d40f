// ---------------------------------------------------------------------------
// Match Ranker: score, filter, stable sort, percentage-normalize, truncate
// ---------------------------------------------------------------------------

use crate::scoring::{score_tokens, tokenize};
use crate::synonyms::SynonymIndex;
use crate::types::{Match, QaEntry};

/// Rank `candidates` against `query` and return at most `top_n` matches.
///
/// Only entries scoring above zero qualify. Equal scores keep the order in
/// which `candidates` yielded them. Percentages are relative to the best
/// qualifying score, so the first match is always `100.0`.
pub fn find_matches<'a, I>(
	query: &str,
	candidates: I,
	top_n: usize,
	synonyms: &SynonymIndex,
) -> Vec<Match<'a>>
where
	I: IntoIterator<Item = &'a QaEntry>,
{
	if top_n == 0 {
		return Vec::new();
	}

	let tokens = tokenize(query);
	let mut scored: Vec<(f64, &'a QaEntry)> = candidates
		.into_iter()
		.map(|entry| (score_tokens(&tokens, entry, synonyms), entry))
		.filter(|(score, _)| *score > 0.0)
		.collect();

	// `sort_by` is stable; ties stay in candidate order.
	scored.sort_by(|a, b| b.0.total_cmp(&a.0));

	let max_score = match scored.first() {
		Some((score, _)) => *score,
		None => return Vec::new(),
	};

	scored
		.into_iter()
		.take(top_n)
		.map(|(score, entry)| Match {
			percentage: round_to_tenth(score / max_score * 100.0),
			score,
			entry,
		})
		.collect()
}

/// Round to one decimal place, halves away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
	(value * 10.0).round() / 10.0
}
