// ---------------------------------------------------------------------------
// QaServer: JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes JSON-RPC 2.0 requests (NDJSON over stdin) to QaEngine operations:
// a `run()` loop, a `dispatch()` match, `with_engine` / `with_engine_mut`
// helpers, and one free-standing handler per method.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};

use crate::engine::QaEngine;
use crate::error::QaError;
use crate::protocol::*;
use crate::scoring::tokenize;
use crate::transport::NdjsonTransport;
use crate::types::{Feedback, MatchView, NewEntry, QaEntry, Signal};

/// Why a handler did not produce a result.
enum Failure {
	InvalidParams(String),
	Qa(QaError),
}

impl From<QaError> for Failure {
	fn from(e: QaError) -> Self {
		Self::Qa(e)
	}
}

type HandlerResult = Result<serde_json::Value, Failure>;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct QaServer {
	transport: NdjsonTransport,
	engine: QaEngine,
}

impl QaServer {
	pub fn new(transport: NdjsonTransport, engine: QaEngine) -> Self {
		Self { transport, engine }
	}

	pub fn engine(&self) -> &QaEngine {
		&self.engine
	}

	/// Main loop over stdin.
	pub fn run(&mut self) -> Result<(), QaError> {
		let stdin = io::stdin();
		self.serve(stdin.lock())
	}

	/// Read requests from `reader` until EOF.
	pub fn serve<R: BufRead>(&mut self, reader: R) -> Result<(), QaError> {
		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	// -- Dispatch ------------------------------------------------------------

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		tracing::debug!(id, method = %req.method, "Request");

		let result = match req.method.as_str() {
			"qa/query" => self.with_engine(|e| handle_query(e, req.params)),
			"qa/feedback" => self.with_engine_mut(|e| handle_feedback(e, req.params)),
			"qa/add" => self.with_engine_mut(|e| handle_add(e, req.params)),
			"qa/list" => self.with_engine(|e| handle_list(e, req.params)),
			"qa/topics" => self.with_engine(|e| Ok(serde_json::json!({ "topics": e.store().topics() }))),
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(Failure::InvalidParams(message)) => {
				self.transport.write_error(id, INVALID_PARAMS, message, None)
			}
			Err(Failure::Qa(e)) => {
				tracing::debug!(id, code = e.code(), "Request failed");
				self.transport
					.write_error(id, QA_ERROR, e.to_string(), Some(e.to_json_rpc_error()))
			}
		}
	}

	// -- Engine accessors ----------------------------------------------------

	fn with_engine<F>(&self, f: F) -> HandlerResult
	where
		F: FnOnce(&QaEngine) -> HandlerResult,
	{
		f(&self.engine)
	}

	fn with_engine_mut<F>(&mut self, f: F) -> HandlerResult
	where
		F: FnOnce(&mut QaEngine) -> HandlerResult,
	{
		f(&mut self.engine)
	}
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(params: serde_json::Value) -> Result<T, Failure> {
	let params = if params.is_null() {
		serde_json::json!({})
	} else {
		params
	};
	serde_json::from_value(params).map_err(|e| Failure::InvalidParams(format!("Invalid params: {}", e)))
}

fn to_value(value: impl serde::Serialize) -> HandlerResult {
	serde_json::to_value(value).map_err(|e| Failure::Qa(e.into()))
}

fn handle_query(engine: &QaEngine, params: serde_json::Value) -> HandlerResult {
	let p: QueryParams = parse_params(params)?;
	let top_n = p.top_n.unwrap_or_else(|| engine.top_n());
	let results: Vec<MatchView> = engine
		.find_matches(&p.query, top_n, p.topic.as_deref())
		.iter()
		.map(MatchView::from)
		.collect();
	Ok(serde_json::json!({ "results": to_value(results)? }))
}

fn handle_feedback(engine: &mut QaEngine, params: serde_json::Value) -> HandlerResult {
	let p: FeedbackParams = parse_params(params)?;

	let feedback = p
		.feedback
		.into_iter()
		.map(|item| {
			let signal = Signal::from_i64(item.signal).ok_or_else(|| {
				Failure::InvalidParams(format!("Invalid signal {} for {}: expected 1 or -1", item.signal, item.id))
			})?;
			let query_tokens = match (item.query_tokens, item.query) {
				(Some(tokens), _) => tokens,
				(None, Some(query)) => tokenize(&query),
				(None, None) => {
					return Err(Failure::InvalidParams(format!(
						"Feedback for {} needs queryTokens or query",
						item.id
					)));
				}
			};
			Ok(Feedback {
				entry_id: item.id,
				signal,
				query_tokens,
			})
		})
		.collect::<Result<Vec<_>, Failure>>()?;

	engine.update_weights(&feedback)?;
	Ok(serde_json::json!({}))
}

fn handle_add(engine: &mut QaEngine, params: serde_json::Value) -> HandlerResult {
	let entry: NewEntry = parse_params(params)?;
	let id = engine.add_entry(entry)?;
	Ok(serde_json::json!({ "id": id }))
}

fn handle_list(engine: &QaEngine, params: serde_json::Value) -> HandlerResult {
	let p: ListParams = parse_params(params)?;
	let entries: Vec<&QaEntry> = match p.topic.as_deref() {
		Some(topic) => engine.store().entries_in_topic(topic).collect(),
		None => engine.qa_list().iter().collect(),
	};
	Ok(serde_json::json!({ "entries": to_value(entries)? }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
