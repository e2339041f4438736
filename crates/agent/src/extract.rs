//! Output extraction.
//!
//! Models are asked for plain text, a numbered list or a JSON object, and
//! routinely wrap the answer in prose or code fences. These functions pull
//! the structured part out. Empty input is never an error: it yields the
//! "nothing" value of the requested kind.

use regex_lite::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use zoogent_core::error::MalformedOutputError;

use crate::prompts::OutputKind;

/// A model reply decoded according to its role's output kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Text(String),
    List(Vec<String>),
    /// `None` when the reply was empty
    Json(Option<serde_json::Value>),
}

impl Extracted {
    pub fn kind(&self) -> OutputKind {
        match self {
            Self::Text(_) => OutputKind::Text,
            Self::List(_) => OutputKind::List,
            Self::Json(_) => OutputKind::Json,
        }
    }

    pub fn into_text(self) -> Result<String, MalformedOutputError> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(other.mismatch(OutputKind::Text)),
        }
    }

    pub fn into_list(self) -> Result<Vec<String>, MalformedOutputError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.mismatch(OutputKind::List)),
        }
    }

    /// Decode a JSON reply into `T`. An empty reply has no object to decode.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, MalformedOutputError> {
        match self {
            Self::Json(Some(value)) => serde_json::from_value(value)
                .map_err(|e| MalformedOutputError::UnexpectedShape(e.to_string())),
            Self::Json(None) => Err(MalformedOutputError::NoJsonObject),
            other => Err(other.mismatch(OutputKind::Json)),
        }
    }

    fn mismatch(&self, wanted: OutputKind) -> MalformedOutputError {
        MalformedOutputError::UnexpectedShape(format!(
            "role declares {:?} output, {:?} was requested",
            self.kind(),
            wanted
        ))
    }
}

/// Extract `raw` according to `kind`.
pub fn extract(kind: OutputKind, raw: &str) -> Result<Extracted, MalformedOutputError> {
    Ok(match kind {
        OutputKind::Text => Extracted::Text(extract_text(raw)),
        OutputKind::List => Extracted::List(extract_list(raw)),
        OutputKind::Json => Extracted::Json(extract_json(raw)?),
    })
}

pub fn extract_text(raw: &str) -> String {
    raw.trim().to_string()
}

fn ordinal_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+(\S.*?)[ \t\r]*$").expect("ordinal pattern is valid")
    })
}

/// Lines shaped like `<n>. <rest>`, with the ordinal stripped, in order.
/// The dot must be followed by whitespace, so `3.5mm jack` is not an item.
pub fn extract_list(raw: &str) -> Vec<String> {
    ordinal_line()
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse the span from the first `{` to the last `}`.
///
/// Blank input gives `Ok(None)`. Non-blank input without such a span, or
/// with a span that is not valid JSON, is a [`MalformedOutputError`].
pub fn extract_json(raw: &str) -> Result<Option<serde_json::Value>, MalformedOutputError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let span = json_span(raw).ok_or(MalformedOutputError::NoJsonObject)?;
    serde_json::from_str(span)
        .map(Some)
        .map_err(|e| MalformedOutputError::InvalidJson(e.to_string()))
}

fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}
