use serde::Deserialize;

// JSON-RPC 2.0 error codes
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const QA_ERROR: i32 = -32000;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
	pub id: u64,
	pub method: String,
	#[serde(default)]
	pub params: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Method params
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
	pub query: String,
	pub top_n: Option<usize>,
	pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
	pub id: String,
	pub signal: i64,
	/// Words of the query being judged; `query` is tokenized when absent.
	pub query_tokens: Option<Vec<String>>,
	pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackParams {
	pub feedback: Vec<FeedbackItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
	pub topic: Option<String>,
}
