// ---------------------------------------------------------------------------
// Interactive prompt
// ---------------------------------------------------------------------------
//
// Line-oriented commands over any BufRead/Write pair:
//
//   q [--n=<N>] [-t <topic>] [-q] <query words...>
//   f -<n> <+|->
//   data -t <topic> -q <question> [-w <word> <weight> ...] -a <answer...>
//   exit | quit
//
// Errors are printed and the loop keeps going. The ids and words of the last
// query are remembered so `f` can refer to a result by its rank.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead, Write};

use crate::engine::QaEngine;
use crate::error::QaError;
use crate::types::{Feedback, NewEntry, Signal, Weights};

const FEEDBACK_USAGE: &str = "usage: f -<result_number> <+|->";

const HELP: &str = "\
Commands:
 q [--n=<count>] [-t <topic>] [-q] <query>              -> find matches
 f -<n> <+|->                                          -> feedback on result #n of the last query
 data -t <topic> -q <question> [-w <word> <weight>]... -a <answer>  -> add new entry
 exit | quit                                           -> leave";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
	Query {
		top_n: Option<usize>,
		topic: Option<String>,
		words: Vec<String>,
	},
	Feedback {
		/// 1-based rank in the last result list.
		rank: usize,
		signal: Signal,
	},
	Data(NewEntry),
	Exit,
	Empty,
	Unknown(String),
}

pub fn parse_line(line: &str) -> Result<ReplCommand, QaError> {
	let line = line.trim();
	if line.is_empty() {
		return Ok(ReplCommand::Empty);
	}

	let (cmd, rest) = match line.split_once(char::is_whitespace) {
		Some((cmd, rest)) => (cmd, rest.trim_start()),
		None => (line, ""),
	};

	match cmd {
		"exit" | "quit" if rest.is_empty() => Ok(ReplCommand::Exit),
		"q" => parse_query(rest),
		"f" => parse_feedback(rest),
		"data" => parse_data(rest),
		_ => Ok(ReplCommand::Unknown(cmd.to_string())),
	}
}

fn parse_query(args: &str) -> Result<ReplCommand, QaError> {
	let mut top_n = None;
	let mut topic = None;
	let mut words = Vec::new();

	let mut tokens = args.split_whitespace();
	while let Some(token) = tokens.next() {
		if let Some(n) = token.strip_prefix("--n=") {
			let n = n
				.parse::<usize>()
				.map_err(|_| QaError::InvalidCommand(format!("invalid number for --n: {n:?}")))?;
			top_n = Some(n);
		} else if token == "-t" {
			let name = tokens
				.next()
				.ok_or_else(|| QaError::InvalidCommand("-t needs a topic".into()))?;
			topic = Some(name.to_string());
		} else if token == "-q" {
			continue;
		} else {
			words.push(token.to_string());
		}
	}

	Ok(ReplCommand::Query { top_n, topic, words })
}

fn parse_feedback(args: &str) -> Result<ReplCommand, QaError> {
	let usage = || QaError::InvalidFeedbackTarget(FEEDBACK_USAGE.into());

	let tokens: Vec<&str> = args.split_whitespace().collect();
	let [rank, symbol] = tokens.as_slice() else {
		return Err(usage());
	};
	let rank = rank
		.strip_prefix('-')
		.and_then(|n| n.parse::<usize>().ok())
		.filter(|n| *n >= 1)
		.ok_or_else(usage)?;
	let signal = Signal::from_symbol(symbol).ok_or_else(usage)?;

	Ok(ReplCommand::Feedback { rank, signal })
}

fn parse_data(args: &str) -> Result<ReplCommand, QaError> {
	let tokens = shell_split(args)?;
	let mut topic = None;
	let mut question = None;
	let mut answer = None;
	let mut weights = Weights::new();

	let mut i = 0;
	while i < tokens.len() {
		match tokens[i].as_str() {
			"-t" if i + 1 < tokens.len() => {
				topic = Some(tokens[i + 1].clone());
				i += 2;
			}
			"-q" if i + 1 < tokens.len() => {
				question = Some(tokens[i + 1].clone());
				i += 2;
			}
			"-w" if i + 2 < tokens.len() => {
				let raw = &tokens[i + 2];
				let weight = raw
					.parse::<f64>()
					.ok()
					.filter(|w| w.is_finite())
					.ok_or_else(|| QaError::InvalidWeightInput(raw.clone()))?;
				if weights.insert(tokens[i + 1].to_lowercase(), weight).is_some() {
					return Err(QaError::InvalidWeightInput(format!(
						"{} is listed more than once (words are case-insensitive)",
						tokens[i + 1]
					)));
				}
				i += 3;
			}
			"-a" if i + 1 < tokens.len() => {
				answer = Some(tokens[i + 1..].join(" "));
				break;
			}
			_ => i += 1,
		}
	}

	let topic = topic.ok_or(QaError::MissingRequiredField("topic"))?;
	let question = question.ok_or(QaError::MissingRequiredField("question"))?;
	let answer = answer.ok_or(QaError::MissingRequiredField("answer"))?;

	Ok(ReplCommand::Data(NewEntry {
		topic,
		question,
		answer,
		weights: (!weights.is_empty()).then_some(weights),
	}))
}

/// Split `input` into words the way a POSIX shell does: whitespace
/// separates, single quotes are literal, double quotes allow `\"` and `\\`,
/// and a bare backslash takes the next character literally.
pub fn shell_split(input: &str) -> Result<Vec<String>, QaError> {
	let mut words = Vec::new();
	let mut current = String::new();
	let mut in_word = false;
	let mut chars = input.chars();

	while let Some(c) = chars.next() {
		match c {
			'\'' => {
				in_word = true;
				loop {
					match chars.next() {
						Some('\'') => break,
						Some(ch) => current.push(ch),
						None => return Err(QaError::InvalidCommand("unterminated single quote".into())),
					}
				}
			}
			'"' => {
				in_word = true;
				loop {
					match chars.next() {
						Some('"') => break,
						Some('\\') => match chars.next() {
							Some(ch @ ('"' | '\\')) => current.push(ch),
							Some(ch) => {
								current.push('\\');
								current.push(ch);
							}
							None => return Err(QaError::InvalidCommand("unterminated double quote".into())),
						},
						Some(ch) => current.push(ch),
						None => return Err(QaError::InvalidCommand("unterminated double quote".into())),
					}
				}
			}
			'\\' => {
				in_word = true;
				match chars.next() {
					Some(ch) => current.push(ch),
					None => return Err(QaError::InvalidCommand("trailing backslash".into())),
				}
			}
			c if c.is_whitespace() => {
				if in_word {
					words.push(std::mem::take(&mut current));
					in_word = false;
				}
			}
			c => {
				in_word = true;
				current.push(c);
			}
		}
	}
	if in_word {
		words.push(current);
	}
	Ok(words)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Repl<'e> {
	engine: &'e mut QaEngine,
	last_results: Vec<String>,
	last_query_words: Vec<String>,
}

impl<'e> Repl<'e> {
	pub fn new(engine: &'e mut QaEngine) -> Self {
		Self {
			engine,
			last_results: Vec::new(),
			last_query_words: Vec::new(),
		}
	}

	/// Read commands until `exit`, `quit` or end of input.
	pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> io::Result<()> {
		writeln!(out, "Interactive Q&A. Type 'exit' to quit.")?;
		writeln!(out, "{HELP}\n")?;

		let mut line = String::new();
		loop {
			write!(out, "> ")?;
			out.flush()?;

			line.clear();
			if input.read_line(&mut line)? == 0 {
				writeln!(out)?;
				return Ok(());
			}

			let command = match parse_line(&line) {
				Ok(ReplCommand::Empty) => continue,
				Ok(ReplCommand::Exit) => {
					writeln!(out, "\nExiting... Bye")?;
					return Ok(());
				}
				Ok(command) => command,
				Err(e) => {
					writeln!(out, "{e}\n")?;
					continue;
				}
			};

			match self.execute(command) {
				Ok(text) => writeln!(out, "{text}\n")?,
				Err(e) => {
					tracing::debug!(code = e.code(), "Command failed");
					writeln!(out, "{e}\n")?;
				}
			}
		}
	}

	/// Run one parsed command and return what to print.
	pub fn execute(&mut self, command: ReplCommand) -> Result<String, QaError> {
		match command {
			ReplCommand::Query { top_n, topic, words } => Ok(self.query(top_n, topic.as_deref(), words)),
			ReplCommand::Feedback { rank, signal } => self.feedback(rank, signal),
			ReplCommand::Data(entry) => {
				let topic = entry.topic.clone();
				let id = self.engine.add_entry(entry)?;
				Ok(format!("Added entry {id} to topic '{topic}'"))
			}
			ReplCommand::Unknown(_) => Ok("Unknown command.".into()),
			ReplCommand::Exit | ReplCommand::Empty => Ok(String::new()),
		}
	}

	fn query(&mut self, top_n: Option<usize>, topic: Option<&str>, words: Vec<String>) -> String {
		if words.is_empty() {
			return "No query provided.".into();
		}

		let top_n = top_n.unwrap_or_else(|| self.engine.top_n());
		let query = words.join(" ");
		let matches = self.engine.find_matches(&query, top_n, topic);
		self.last_results = matches.iter().map(|m| m.entry.id.clone()).collect();
		self.last_query_words = words;

		if matches.is_empty() {
			return "No matches found.".into();
		}

		let mut text = String::from("==== Top results ====");
		for (i, m) in matches.iter().enumerate() {
			text.push_str(&format!(
				"\n{}. {:.1}% -> [{}] {} -> {}",
				i + 1,
				m.percentage,
				m.entry.topic,
				m.entry.question,
				m.entry.answer.replace("\\n", "\n"),
			));
		}
		text
	}

	fn feedback(&mut self, rank: usize, signal: Signal) -> Result<String, QaError> {
		if self.last_results.is_empty() {
			return Err(QaError::InvalidFeedbackTarget(
				"no recent query results to give feedback on".into(),
			));
		}
		let entry_id = rank
			.checked_sub(1)
			.and_then(|i| self.last_results.get(i))
			.cloned()
			.ok_or_else(|| QaError::InvalidFeedbackTarget(format!("no result #{rank}")))?;

		self.engine.update_weights(&[Feedback {
			entry_id,
			signal,
			query_tokens: self.last_query_words.clone(),
		}])?;
		Ok(format!("Feedback applied to result #{rank}"))
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
