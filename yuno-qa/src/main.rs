use anyhow::{Context, Result};
use clap::Parser;
use yuno_qa::config::{CliArgs, Command};
use yuno_qa::engine::QaEngine;
use yuno_qa::repl::Repl;
use yuno_qa::server::QaServer;
use yuno_qa::synonyms::SynonymIndex;
use yuno_qa::transport::NdjsonTransport;

fn main() -> Result<()> {
	let args = CliArgs::parse();

	// Logs go to stderr; stdout carries the prompt or the JSON-RPC stream
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_level())),
		)
		.init();

	let synonyms = match &args.synonyms {
		Some(path) => SynonymIndex::load(path).unwrap_or_else(|e| {
			tracing::warn!(code = e.code(), "{}; continuing without synonyms", e);
			SynonymIndex::empty()
		}),
		None => SynonymIndex::builtin(),
	};

	let config = args.to_qa_config();
	let (mut engine, report) = QaEngine::open(&config, synonyms)
		.with_context(|| format!("Failed to open data directory {}", config.data_dir.display()))?;

	tracing::info!(
		dir = %config.data_dir.display(),
		entries = report.entries,
		skipped = report.corrupt.len(),
		"yuno-qa ready"
	);

	match args.command() {
		Command::Repl => {
			let stdin = std::io::stdin();
			let mut stdout = std::io::stdout();
			Repl::new(&mut engine).run(stdin.lock(), &mut stdout)?;
		}
		Command::Serve => {
			let mut server = QaServer::new(NdjsonTransport::new(), engine);
			server.run()?;
		}
	}

	Ok(())
}
