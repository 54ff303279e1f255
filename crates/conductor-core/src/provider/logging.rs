//! LLM request/response logging
//!
//! Set the `LLM_LOG_FILE` environment variable to append one JSON object per
//! reasoning-engine round trip.
//!
//! Example: `LLM_LOG_FILE=/tmp/llm.log conductor ask "..."`

use serde_json::json;
use std::io::Write;
use tracing::{debug, warn};

use super::{EngineMessage, EngineResponse, FunctionDefinition};

/// What to include in the log entry
#[derive(Default)]
pub struct LogConfig<'a> {
    pub model: &'a str,
    pub provider: Option<&'a str>,
    pub messages: &'a [EngineMessage],
    pub functions: Option<&'a [FunctionDefinition]>,
    pub result: Option<&'a EngineResponse>,
    pub error: Option<&'a str>,
}

pub fn log_llm_interaction(config: LogConfig<'_>) {
    let log_file = match std::env::var("LLM_LOG_FILE") {
        Ok(path) => path,
        Err(_) => return,
    };

    let entry = json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model": config.model,
        "provider": config.provider,
        "request": {
            "messages": config.messages,
            "message_count": config.messages.len(),
            "functions": config.functions.map(|f| f.iter().map(|def| def.name.as_str()).collect::<Vec<_>>()),
        },
        "response": config.result.map(|r| json!({
            "type": if r.has_function_calls() { "function_calls" } else { "message" },
            "content": r.content,
            "function_calls": r.function_calls,
        })),
        "error": config.error,
    });

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
    {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{}", serde_json::to_string(&entry).unwrap_or_default()) {
                warn!("Failed to write to LLM log file: {}", e);
            }
        }
        Err(e) => {
            warn!("Failed to open LLM log file {}: {}", log_file, e);
        }
    }

    debug!("Logged LLM interaction to {}", log_file);
}
