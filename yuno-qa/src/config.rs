use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::engine::{DEFAULT_TOP_N, QaConfig};

#[derive(Parser, Debug)]
#[command(name = "yuno-qa", version, about = "Weighted question/answer matcher with feedback learning")]
pub struct CliArgs {
	/// Directory holding one `<topic>.json` partition per topic
	#[arg(long, env = "YUNO_QA_DATA_DIR", global = true)]
	pub data_dir: Option<PathBuf>,

	/// Synonym table (JSON object of word -> [related words]); built-in table if unset
	#[arg(long, env = "YUNO_QA_SYNONYMS", global = true)]
	pub synonyms: Option<PathBuf>,

	/// Default number of matches per query
	#[arg(long, default_value_t = DEFAULT_TOP_N, global = true)]
	pub top_n: usize,

	/// Write partitions in place instead of temp file + rename
	#[arg(long, global = true)]
	pub no_atomic_writes: bool,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, env = "YUNO_QA_LOG_LEVEL", global = true)]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	/// Interactive prompt on stdin/stdout (default)
	Repl,
	/// JSON-RPC 2.0 over NDJSON stdio
	Serve,
}

impl CliArgs {
	pub fn command(&self) -> Command {
		self.command.unwrap_or(Command::Repl)
	}

	/// `--log-level` if given, else `info` for the server and `warn` for the
	/// prompt so log lines stay out of the way.
	pub fn log_level(&self) -> &str {
		match (&self.log_level, self.command()) {
			(Some(level), _) => level.as_str(),
			(None, Command::Serve) => "info",
			(None, Command::Repl) => "warn",
		}
	}

	pub fn to_qa_config(&self) -> QaConfig {
		QaConfig {
			data_dir: self.data_dir.clone().unwrap_or_else(default_data_dir),
			top_n: self.top_n,
			atomic_writes: !self.no_atomic_writes,
			..Default::default()
		}
	}
}

/// `<platform data dir>/yuno/data_qa`, or `./data_qa` when the platform has
/// no data dir.
pub fn default_data_dir() -> PathBuf {
	dirs::data_dir()
		.map(|d| d.join("yuno").join("data_qa"))
		.unwrap_or_else(|| PathBuf::from("data_qa"))
}
