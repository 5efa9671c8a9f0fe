use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,
    ValidationInvalidJson,

    RegenIntegrity,
    RegenRewriteAborted,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::RegenIntegrity => "regen.integrity",
            ErrorCode::RegenRewriteAborted => "regen.rewrite_aborted",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Where a rewrite run stopped, so a partial run can be audited.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteProgressDetails {
    /// File being processed when the run stopped.
    pub file: String,
    /// Files already persisted before the failure.
    pub rewritten_files: Vec<String>,
    /// Files that were never reached.
    pub remaining_files: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenIntegrityDetails {
    pub guid: String,
    #[serde(flatten)]
    pub progress: RewriteProgressDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenRewriteAbortedDetails {
    pub error: String,
    #[serde(flatten)]
    pub progress: RewriteProgressDetails,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn validation_invalid_json(
        err: serde_json::Error,
        context: Option<String>,
        input: Option<String>,
    ) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
            "input": input,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    /// A referenced identifier had no remap entry. Files listed in the
    /// details stay rewritten.
    pub fn regen_integrity(guid: impl Into<String>, progress: RewriteProgressDetails) -> Self {
        let guid = guid.into();
        let message = format!("No remap entry for GUID {} in {}", guid, progress.file);
        let rewritten = progress.rewritten_files.len();

        Self::new(
            ErrorCode::RegenIntegrity,
            message,
            to_details(RegenIntegrityDetails { guid, progress }),
        )
        .with_rewritten_hint(rewritten)
    }

    pub fn regen_rewrite_aborted(
        error: impl Into<String>,
        progress: RewriteProgressDetails,
    ) -> Self {
        let message = format!("Rewrite aborted at {}", progress.file);
        let rewritten = progress.rewritten_files.len();

        Self::new(
            ErrorCode::RegenRewriteAborted,
            message,
            to_details(RegenRewriteAbortedDetails {
                error: error.into(),
                progress,
            }),
        )
        .with_rewritten_hint(rewritten)
    }

    fn with_rewritten_hint(self, rewritten: usize) -> Self {
        if rewritten == 0 {
            self.with_hint("No files were modified")
        } else {
            self.with_hint(format!(
                "{} file(s) were already rewritten; restore the project from backup before retrying",
                rewritten
            ))
        }
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
