use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Status of a monitoring check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    Mismatch,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
            MonitorStatus::Mismatch => write!(f, "mismatch"),
        }
    }
}

/// Per-variant payload of a check result.
///
/// `Mismatch` is produced by the JSON equality probe when the body differs
/// from the expected document. It intentionally carries no timing or status
/// code: the comparison result replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Up {
        response_time_ms: u64,
        observed_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
    Down {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_time_ms: Option<u64>,
        observed_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
    Mismatch {
        expected: Value,
        actual: Value,
    },
}

/// Result of one probe against one target
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    /// URL, address, host name or connection string that was probed
    pub target: String,

    pub outcome: Outcome,
}

impl CheckResult {
    /// A passing check
    pub fn up(target: impl Into<String>, response_time_ms: u64, status_code: Option<u16>) -> Self {
        Self {
            target: target.into(),
            outcome: Outcome::Up { response_time_ms, observed_at: Utc::now(), status_code },
        }
    }

    /// A failing check without timing; chain the `with_*` helpers to add detail
    pub fn down(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            outcome: Outcome::Down {
                response_time_ms: None,
                observed_at: Utc::now(),
                status_code: None,
                message: message.into(),
                cause: None,
            },
        }
    }

    /// A body that did not match the expected document
    pub fn mismatch(target: impl Into<String>, expected: Value, actual: Value) -> Self {
        Self { target: target.into(), outcome: Outcome::Mismatch { expected, actual } }
    }

    /// Record elapsed time on a failed check
    pub fn with_response_time(mut self, elapsed_ms: u64) -> Self {
        if let Outcome::Down { response_time_ms, .. } = &mut self.outcome {
            *response_time_ms = Some(elapsed_ms);
        }
        self
    }

    /// Record the status code received by a failed check
    pub fn with_status_code(mut self, code: u16) -> Self {
        if let Outcome::Down { status_code, .. } = &mut self.outcome {
            *status_code = Some(code);
        }
        self
    }

    /// Attach the underlying error to a failed check
    pub fn with_cause(mut self, detail: impl std::fmt::Display) -> Self {
        if let Outcome::Down { cause, .. } = &mut self.outcome {
            *cause = Some(detail.to_string());
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Up { .. })
    }

    pub fn status(&self) -> MonitorStatus {
        match self.outcome {
            Outcome::Up { .. } => MonitorStatus::Up,
            Outcome::Down { .. } => MonitorStatus::Down,
            Outcome::Mismatch { .. } => MonitorStatus::Mismatch,
        }
    }

    pub fn response_time_ms(&self) -> Option<u64> {
        match &self.outcome {
            Outcome::Up { response_time_ms, .. } => Some(*response_time_ms),
            Outcome::Down { response_time_ms, .. } => *response_time_ms,
            Outcome::Mismatch { .. } => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.outcome {
            Outcome::Up { status_code, .. } | Outcome::Down { status_code, .. } => *status_code,
            Outcome::Mismatch { .. } => None,
        }
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        match &self.outcome {
            Outcome::Up { observed_at, .. } | Outcome::Down { observed_at, .. } => {
                Some(*observed_at)
            }
            Outcome::Mismatch { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Down { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Down { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

/// Wire form: the variant fields flattened under a `success`/`target` header
#[derive(Serialize)]
struct CheckResultWire<'a> {
    success: bool,
    target: &'a str,
    #[serde(flatten)]
    outcome: &'a Outcome,
}

impl Serialize for CheckResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CheckResultWire { success: self.is_success(), target: &self.target, outcome: &self.outcome }
            .serialize(serializer)
    }
}
