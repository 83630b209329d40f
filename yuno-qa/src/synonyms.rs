// ---------------------------------------------------------------------------
// Synonym Index: read-only word -> related words table
// ---------------------------------------------------------------------------
//
// Loaded once at startup and shared immutably with scoring. The table is
// used exactly as authored: if "create" lists "new", "new" only lists
// "create" when the source says so.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::path::Path;

use crate::error::QaError;

const BUILTIN: &[(&str, &[&str])] = &[
	("create", &["new", "add"]),
	("new", &["create", "add"]),
	("app", &["application"]),
	("application", &["app"]),
	("repo", &["repository"]),
	("repository", &["repo"]),
];

#[derive(Debug, Clone, Default)]
pub struct SynonymIndex {
	map: HashMap<String, Vec<String>>,
}

impl SynonymIndex {
	/// An empty index; scoring degrades to exact matches only.
	pub fn empty() -> Self {
		Self::default()
	}

	/// The small default table shipped with the binary.
	pub fn builtin() -> Self {
		Self::from_pairs(
			BUILTIN
				.iter()
				.map(|(word, related)| (*word, related.iter().copied())),
		)
	}

	/// Build from `(word, related words)` pairs. Words are lowercased so they
	/// line up with query tokens.
	pub fn from_pairs<'a, I, R>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (&'a str, R)>,
		R: IntoIterator<Item = &'a str>,
	{
		let map = pairs
			.into_iter()
			.map(|(word, related)| {
				(
					word.to_lowercase(),
					related.into_iter().map(str::to_lowercase).collect(),
				)
			})
			.collect();
		Self { map }
	}

	/// Load a JSON object of the form `{"word": ["related", ...]}`.
	///
	/// A missing file yields an empty index. A file that exists but does not
	/// parse is an error so the caller can decide what to fall back to.
	pub fn load(path: &Path) -> Result<Self, QaError> {
		if !path.exists() {
			tracing::warn!(path = %path.display(), "Synonym file not found, using empty table");
			return Ok(Self::empty());
		}

		let raw = std::fs::read_to_string(path)?;
		let parsed: HashMap<String, Vec<String>> = serde_json::from_str(&raw).map_err(|e| {
			QaError::Serialization(format!("Invalid synonym file {}: {}", path.display(), e))
		})?;

		let index = Self::from_pairs(
			parsed
				.iter()
				.map(|(word, related)| (word.as_str(), related.iter().map(String::as_str))),
		);
		tracing::info!(path = %path.display(), words = index.len(), "Loaded synonym table");
		Ok(index)
	}

	/// Related words for `word`, in authored order. Empty if unknown.
	pub fn lookup(&self, word: &str) -> &[String] {
		self.map.get(word).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn len(&self) -> usize {
		self.map.len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}
}
