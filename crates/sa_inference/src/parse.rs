//! Strict parsing of model output.
//!
//! Generation responses are untrusted text. They may be wrapped in markdown
//! fences, truncated or off-schema; anything that does not parse cleanly is a
//! `MalformedResponse` carrying the raw text.

use sa_core::{Error, FinalReport, Result, SentimentItem, MAX_SENTIMENT_SCORE, MIN_SENTIMENT_SCORE};
use serde::de::DeserializeOwned;

/// Strip a surrounding ```` ``` ```` or ```` ```json ```` fence, if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // the info string runs to the end of the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches("json"),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(malformed("empty response", raw));
    }
    serde_json::from_str(body).map_err(|e| malformed(e.to_string(), raw))
}

pub fn parse_sentiment_item(raw: &str) -> Result<SentimentItem> {
    let item: SentimentItem = parse_model_json(raw)?;
    if !(MIN_SENTIMENT_SCORE..=MAX_SENTIMENT_SCORE).contains(&item.sentiment_score) {
        return Err(malformed(
            format!("sentiment_score {} outside 1-10", item.sentiment_score),
            raw,
        ));
    }
    Ok(item)
}

pub fn parse_final_report(raw: &str) -> Result<FinalReport> {
    parse_model_json(raw)
}

fn malformed(reason: impl Into<String>, raw: &str) -> Error {
    Error::MalformedResponse {
        reason: reason.into(),
        raw: raw.to_string(),
    }
}
