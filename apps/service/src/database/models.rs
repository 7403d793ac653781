use serde::{Deserialize, Serialize};

use crate::monitoring::types::{CheckResult, MonitorStatus, Outcome};

/// One row of `check_results`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub id: Option<i64>,
    pub target: String,
    pub status: MonitorStatus,
    pub success: bool,
    pub response_time_ms: Option<u64>,
    pub status_code: Option<u16>,
    pub message: Option<String>,
    pub cause: Option<String>,
    /// JSON text of the expected document (mismatch only)
    pub expected: Option<String>,
    /// JSON text of the received document (mismatch only)
    pub actual: Option<String>,
    /// Unix milliseconds
    pub observed_at: Option<i64>,
    /// Unix milliseconds
    pub created_at: i64,
}

impl ResultRow {
    /// Flatten a check result into its stored columns
    pub fn from_check_result(result: &CheckResult) -> Self {
        let (expected, actual) = match &result.outcome {
            Outcome::Mismatch { expected, actual } => {
                (Some(expected.to_string()), Some(actual.to_string()))
            }
            _ => (None, None),
        };

        Self {
            id: None,
            target: result.target.clone(),
            status: result.status(),
            success: result.is_success(),
            response_time_ms: result.response_time_ms(),
            status_code: result.status_code(),
            message: result.message().map(str::to_string),
            cause: result.cause().map(str::to_string),
            expected,
            actual,
            observed_at: result.observed_at().map(|at| at.timestamp_millis()),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn parse_status(status: &str) -> Option<MonitorStatus> {
        match status {
            "up" => Some(MonitorStatus::Up),
            "down" => Some(MonitorStatus::Down),
            "mismatch" => Some(MonitorStatus::Mismatch),
            _ => None,
        }
    }
}
