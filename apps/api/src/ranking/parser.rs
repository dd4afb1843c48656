//! Ranking response parsing — locate, parse, then validate.
//!
//! The model is told to return bare JSON but often wraps it in prose or code
//! fences, so the first balanced `{...}` span is located before parsing. The
//! parsed value is then validated entry by entry: anything that does not name a
//! submitted candidate with a positive integer rank is dropped.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::ranking::models::{AnalysisError, RankingEntry};

const DEFAULT_KEY_REASON: &str = "N/A";

#[derive(Debug, Deserialize)]
struct RawRankingResponse {
    rankings: Vec<Value>,
}

/// Returns the first balanced `{...}` span in `text`, ignoring braces inside
/// JSON string literals. A `{` that never closes is skipped and the scan
/// resumes at the next one.
pub fn find_json_object(text: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(relative) = text[from..].find('{') {
        let start = from + relative;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        from = start + 1;
    }
    None
}

/// Byte length of the balanced object opening at the start of `text`.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses a ranking-pass response into validated entries, in response order.
///
/// `submitted` is the set of filenames that were actually sent; entries naming
/// anything else are rejected. A filename ranked twice keeps its first entry.
pub fn parse_rankings(
    response: &str,
    submitted: &HashSet<&str>,
) -> Result<Vec<RankingEntry>, AnalysisError> {
    let span = find_json_object(response).ok_or_else(|| {
        AnalysisError::MalformedResponse("no JSON object found in response".to_string())
    })?;

    let raw: RawRankingResponse = serde_json::from_str(span)
        .map_err(|e| AnalysisError::MalformedResponse(format!("invalid ranking JSON: {e}")))?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw.rankings.len());

    for (position, value) in raw.rankings.iter().enumerate() {
        let entry = match validate_entry(value, submitted) {
            Ok(entry) => entry,
            Err(reason) => {
                warn!("Dropping ranking entry #{}: {reason}", position + 1);
                continue;
            }
        };
        if !seen.insert(entry.filename.clone()) {
            warn!("Dropping duplicate ranking for '{}'", entry.filename);
            continue;
        }
        entries.push(entry);
    }

    if entries.is_empty() {
        return Err(AnalysisError::MalformedResponse(
            "response contained no usable rankings".to_string(),
        ));
    }

    Ok(entries)
}

fn validate_entry(value: &Value, submitted: &HashSet<&str>) -> Result<RankingEntry, String> {
    let filename = value
        .get("filename")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("missing filename")?;

    if !submitted.contains(filename) {
        return Err(format!("'{filename}' was not submitted"));
    }

    let rank = value
        .get("rank")
        .and_then(as_positive_integer)
        .ok_or_else(|| format!("'{filename}' has no positive integer rank"))?;

    let match_percentage = value
        .get("match_percentage")
        .and_then(as_number)
        .map(|p| p.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(0);

    let key_reason = value
        .get("key_reason")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_KEY_REASON)
        .to_string();

    Ok(RankingEntry {
        filename: filename.to_string(),
        rank,
        match_percentage,
        key_reason,
    })
}

/// Accepts `3`, `3.0` and `"3"`.
fn as_positive_integer(value: &Value) -> Option<u32> {
    let number = as_number(value)?;
    if number >= 1.0 && number.fract() == 0.0 && number <= f64::from(u32::MAX) {
        Some(number as u32)
    } else {
        None
    }
}

/// Accepts JSON numbers and numeric strings, with an optional trailing `%`.
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
