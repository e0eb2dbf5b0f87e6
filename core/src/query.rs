use serde::Serialize;

use crate::error::ValidationError;

/// Fewest results a query may ask for.
pub const MAX_RESULTS_MIN: u64 = 1;
/// Most results a query may ask for.
pub const MAX_RESULTS_MAX: u64 = 20;

/// Body of `POST /query`.
///
/// Optional fields are omitted from the JSON body when unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// What the agent is trying to understand
    pub question: String,
    /// The agent's situation, for more targeted results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    /// Domain filter, transmitted in the order given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_tags: Option<Vec<String>>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: None,
            max_results: None,
            min_confidence: None,
            domain_tags: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.question.trim().is_empty() {
            return Err(ValidationError::empty("question"));
        }
        if let Some(max_results) = self.max_results {
            if !(MAX_RESULTS_MIN..=MAX_RESULTS_MAX).contains(&max_results) {
                return Err(ValidationError::OutOfRange {
                    field: "maxResults".to_string(),
                    min: MAX_RESULTS_MIN as f64,
                    max: MAX_RESULTS_MAX as f64,
                    actual: max_results as f64,
                });
            }
        }
        if let Some(min_confidence) = self.min_confidence {
            crate::contribution::check_confidence("minConfidence", min_confidence)?;
        }
        Ok(())
    }
}
