//! Gateway wire types (execute request/response bodies).

use serde::{Deserialize, Serialize};

use crate::exec::ToolOutput;

/// `POST /execute` body: `{ "command": "<args for the tool>" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub command: String,
}

/// Tool output returned on 200 and 500. Both streams are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub stdout: String,
    pub stderr: String,
}

impl From<ToolOutput> for ExecuteResponse {
    fn from(out: ToolOutput) -> Self {
        Self {
            stdout: out.stdout,
            stderr: out.stderr,
        }
    }
}

/// Body for requests rejected before the tool runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub stderr: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { stderr: msg.into() }
    }
}
