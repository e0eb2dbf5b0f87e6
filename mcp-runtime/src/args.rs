//! Tool argument extraction.
//!
//! Turns the loosely typed `arguments` object of a `tools/call` into the
//! request records from `carapace-core`, then runs their range and length
//! checks. Keys the schema does not declare are ignored and never forwarded.

use carapace_core::{ContributionDraft, ContributionPatch, QueryRequest, ValidationError};
use serde_json::{Map, Value};

pub const QUERY_KEYS: [&str; 5] = [
    "question",
    "context",
    "maxResults",
    "minConfidence",
    "domainTags",
];
pub const CONTRIBUTION_KEYS: [&str; 6] = [
    "claim",
    "confidence",
    "reasoning",
    "applicability",
    "limitations",
    "domainTags",
];
pub const ID_KEY: &str = "id";

pub fn query_request(args: &Map<String, Value>) -> Result<QueryRequest, ValidationError> {
    let request = QueryRequest {
        question: required_string(args, "question")?,
        context: optional_string(args, "context")?,
        max_results: optional_u64(args, "maxResults")?,
        min_confidence: optional_f64(args, "minConfidence")?,
        domain_tags: optional_string_array(args, "domainTags")?,
    };
    request.validate()?;
    Ok(request)
}

pub fn contribution_draft(args: &Map<String, Value>) -> Result<ContributionDraft, ValidationError> {
    let draft = ContributionDraft {
        claim: required_string(args, "claim")?,
        confidence: required_f64(args, "confidence")?,
        reasoning: optional_string(args, "reasoning")?,
        applicability: optional_string(args, "applicability")?,
        limitations: optional_string(args, "limitations")?,
        domain_tags: optional_string_array(args, "domainTags")?,
    };
    draft.validate()?;
    Ok(draft)
}

/// Splits `id` off the update arguments; the rest becomes the patch.
pub fn contribution_update(
    args: &Map<String, Value>,
) -> Result<(String, ContributionPatch), ValidationError> {
    let id = contribution_id(args)?;
    let patch = ContributionPatch {
        claim: optional_string(args, "claim")?,
        confidence: optional_f64(args, "confidence")?,
        reasoning: optional_string(args, "reasoning")?,
        applicability: optional_string(args, "applicability")?,
        limitations: optional_string(args, "limitations")?,
        domain_tags: optional_string_array(args, "domainTags")?,
    };
    patch.validate()?;
    Ok((id, patch))
}

/// Identifiers are opaque: any non-empty string is sent as given.
pub fn contribution_id(args: &Map<String, Value>) -> Result<String, ValidationError> {
    match args.get(ID_KEY) {
        None | Some(Value::Null) => Err(ValidationError::missing(ID_KEY)),
        Some(Value::String(v)) if v.is_empty() => Err(ValidationError::empty(ID_KEY)),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(ValidationError::wrong_type(ID_KEY, "a string")),
    }
}

/// Argument keys outside `declared`, sorted.
pub fn undeclared_keys<'a>(args: &'a Map<String, Value>, declared: &[&str]) -> Vec<&'a str> {
    let mut keys: Vec<&str> = args
        .keys()
        .map(String::as_str)
        .filter(|key| !declared.contains(key))
        .collect();
    keys.sort_unstable();
    keys
}

fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ValidationError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ValidationError::missing(key)),
        Some(Value::String(v)) if v.trim().is_empty() => Err(ValidationError::empty(key)),
        Some(Value::String(v)) => Ok(v.clone()),
        Some(_) => Err(ValidationError::wrong_type(key, "a string")),
    }
}

fn optional_string(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ValidationError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(ValidationError::wrong_type(key, "a string")),
    }
}

fn required_f64(args: &Map<String, Value>, key: &str) -> Result<f64, ValidationError> {
    optional_f64(args, key)?.ok_or_else(|| ValidationError::missing(key))
}

fn optional_f64(args: &Map<String, Value>, key: &str) -> Result<Option<f64>, ValidationError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| ValidationError::wrong_type(key, "a number")),
        Some(_) => Err(ValidationError::wrong_type(key, "a number")),
    }
}

/// Accepts integral floats such as `5.0`, which some hosts emit for integers.
fn optional_u64(args: &Map<String, Value>, key: &str) -> Result<Option<u64>, ValidationError> {
    let expected = "a non-negative integer";
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                return Ok(Some(v));
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => {
                    Ok(Some(f as u64))
                }
                _ => Err(ValidationError::wrong_type(key, expected)),
            }
        }
        Some(_) => Err(ValidationError::wrong_type(key, expected)),
    }
}

fn optional_string_array(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, ValidationError> {
    let items = match args.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::wrong_type(key, "an array of strings")),
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ValidationError::wrong_type(format!("{key}[{index}]"), "a string"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
