//! Isolated-context worker.
//!
//! Runs as a child process of the sandboxed backend (`codepad worker`) and
//! handles exactly one message:
//! - Parent writes one JSON request line on stdin
//! - Worker writes one JSON reply line on stdout and exits

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

/// Message from the parent
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub source: String,
    /// Engine loop cap; overrides the worker's own configuration when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_iteration_limit: Option<u64>,
}

impl WorkerRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            loop_iteration_limit: None,
        }
    }
}

/// Message back to the parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerReply {
    Output { text: String },
    Error { message: String },
}

/// Read a single request from `input`, evaluate it, write the reply to `output`.
pub fn serve<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    loop_iteration_limit: Option<u64>,
) -> std::io::Result<()> {
    let mut line = String::new();
    let bytes_read = input.read_line(&mut line)?;

    let reply = if bytes_read == 0 {
        WorkerReply::Error {
            message: "no request received".to_string(),
        }
    } else {
        process_request(&line, loop_iteration_limit)
    };

    let reply_json = serde_json::to_string(&reply)?;
    writeln!(output, "{}", reply_json)?;
    output.flush()
}

/// Process a request line and return the reply
pub fn process_request(request_line: &str, loop_iteration_limit: Option<u64>) -> WorkerReply {
    let request: WorkerRequest = match serde_json::from_str(request_line.trim()) {
        Ok(req) => req,
        Err(e) => {
            return WorkerReply::Error {
                message: format!("Invalid request: {}", e),
            };
        }
    };

    evaluate(
        &request.source,
        request.loop_iteration_limit.or(loop_iteration_limit),
    )
}

#[cfg(feature = "js")]
fn evaluate(source: &str, loop_iteration_limit: Option<u64>) -> WorkerReply {
    match crate::runner::evaluate_script(source, loop_iteration_limit) {
        Ok(text) => WorkerReply::Output { text },
        Err(e) => WorkerReply::Error {
            message: e.to_string(),
        },
    }
}

#[cfg(not(feature = "js"))]
fn evaluate(_source: &str, _loop_iteration_limit: Option<u64>) -> WorkerReply {
    WorkerReply::Error {
        message: "JavaScript support was not compiled in".to_string(),
    }
}
