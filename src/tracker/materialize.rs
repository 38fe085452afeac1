use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

use crate::util::{write_json_pretty, write_string};

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z]*[ \t]*\r?\n(?P<body>.*?)\r?\n?```\s*$")
            .expect("valid code fence regex")
    })
}

pub fn strip_code_fence(raw_text: &str) -> &str {
    fence_pattern()
        .captures(raw_text)
        .and_then(|captures| captures.name("body"))
        .map(|body| body.as_str())
        .unwrap_or(raw_text)
}

/// Writes the raw response and, when it parses as JSON, the structured
/// artifact. Returns whether the structured artifact was written.
pub fn materialize(raw_text: &str, structured_path: &Path, raw_path: &Path) -> Result<bool> {
    write_string(raw_path, raw_text)?;

    let cleaned = strip_code_fence(raw_text);
    let parsed = match serde_json::from_str::<serde_json::Value>(cleaned) {
        Ok(value) => value,
        Err(err) => {
            debug!(
                path = %raw_path.display(),
                error = %err,
                "response is not valid json, keeping raw text only"
            );
            return Ok(false);
        }
    };

    if let Err(err) = write_json_pretty(structured_path, &parsed) {
        warn!(
            path = %structured_path.display(),
            error = %err,
            "failed to write structured response"
        );
        let _ = fs::remove_file(structured_path);
        return Ok(false);
    }

    debug!(path = %structured_path.display(), "wrote structured response");
    Ok(true)
}
