use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
	#[error("Corrupt partition '{topic}': {reason}")]
	CorruptPartition { topic: String, reason: String },
	#[error("Invalid feedback target: {0}")]
	InvalidFeedbackTarget(String),
	#[error("Invalid weight: {0}")]
	InvalidWeightInput(String),
	#[error("Missing required field: {0}")]
	MissingRequiredField(&'static str),
	#[error("Invalid topic name: {0:?}")]
	InvalidTopic(String),
	#[error("Invalid command: {0}")]
	InvalidCommand(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl QaError {
	pub fn code(&self) -> &str {
		match self {
			Self::CorruptPartition { .. } => "QA_CORRUPT_PARTITION",
			Self::InvalidFeedbackTarget(_) => "QA_INVALID_FEEDBACK",
			Self::InvalidWeightInput(_) => "QA_INVALID_WEIGHT",
			Self::MissingRequiredField(_) => "QA_MISSING_FIELD",
			Self::InvalidTopic(_) => "QA_INVALID_TOPIC",
			Self::InvalidCommand(_) => "QA_INVALID_COMMAND",
			Self::Io(_) => "QA_IO",
			Self::Serialization(_) => "QA_SERIALIZATION",
		}
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"qaCode": self.code(),
			"message": self.to_string(),
		})
	}
}

impl From<serde_json::Error> for QaError {
	fn from(e: serde_json::Error) -> Self {
		Self::Serialization(e.to_string())
	}
}
