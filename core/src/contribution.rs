use serde::Serialize;

use crate::error::ValidationError;

pub const CLAIM_MAX_CHARS: usize = 2000;
pub const REASONING_MAX_CHARS: usize = 5000;
pub const APPLICABILITY_MAX_CHARS: usize = 3000;
pub const LIMITATIONS_MAX_CHARS: usize = 3000;

/// Body of `POST /contributions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDraft {
    /// The core insight
    pub claim: String,
    /// 0.0 to 1.0 inclusive
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limitations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_tags: Option<Vec<String>>,
}

impl ContributionDraft {
    pub fn new(claim: impl Into<String>, confidence: f64) -> Self {
        Self {
            claim: claim.into(),
            confidence,
            reasoning: None,
            applicability: None,
            limitations: None,
            domain_tags: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_claim(&self.claim)?;
        check_confidence("confidence", self.confidence)?;
        check_text_fields(
            self.reasoning.as_deref(),
            self.applicability.as_deref(),
            self.limitations.as_deref(),
        )
    }
}

/// Body of `PUT /contributions/{id}`.
///
/// A partial update: `None` means "leave as is" and the key is left out of
/// the request body entirely. There is no way to clear a field through this
/// type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limitations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_tags: Option<Vec<String>>,
}

impl ContributionPatch {
    /// True when no field would be transmitted.
    pub fn is_empty(&self) -> bool {
        self.claim.is_none()
            && self.confidence.is_none()
            && self.reasoning.is_none()
            && self.applicability.is_none()
            && self.limitations.is_none()
            && self.domain_tags.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(claim) = &self.claim {
            check_claim(claim)?;
        }
        if let Some(confidence) = self.confidence {
            check_confidence("confidence", confidence)?;
        }
        check_text_fields(
            self.reasoning.as_deref(),
            self.applicability.as_deref(),
            self.limitations.as_deref(),
        )
    }
}

fn check_claim(claim: &str) -> Result<(), ValidationError> {
    if claim.trim().is_empty() {
        return Err(ValidationError::empty("claim"));
    }
    check_max_chars("claim", claim, CLAIM_MAX_CHARS)
}

fn check_text_fields(
    reasoning: Option<&str>,
    applicability: Option<&str>,
    limitations: Option<&str>,
) -> Result<(), ValidationError> {
    if let Some(reasoning) = reasoning {
        check_max_chars("reasoning", reasoning, REASONING_MAX_CHARS)?;
    }
    if let Some(applicability) = applicability {
        check_max_chars("applicability", applicability, APPLICABILITY_MAX_CHARS)?;
    }
    if let Some(limitations) = limitations {
        check_max_chars("limitations", limitations, LIMITATIONS_MAX_CHARS)?;
    }
    Ok(())
}

/// Length is counted in Unicode scalar values, not bytes.
pub(crate) fn check_max_chars(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn check_confidence(field: &str, value: f64) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: 1.0,
            actual: value,
        });
    }
    Ok(())
}
