//! FHIR questionnaire boundary support for the repopulation engine.
//!
//! This crate provides **wire models** and **parse/render facades** for the two FHIR resources
//! the engine works on:
//! - `Questionnaire` (the static item-definition tree)
//! - `QuestionnaireResponse` (server-populated and currently-edited answer trees)
//!
//! This crate focuses on:
//! - FHIR R4 JSON alignment (YAML is accepted as an alternative text encoding)
//! - lossless serialisation: members the engine does not interpret are carried through untouched
//! - reading the SDC rendering extensions that affect repopulation context
//!
//! It does not validate questionnaires beyond what deserialisation requires, and it does not
//! evaluate enableWhen or FHIRPath expressions.

pub mod extensions;
pub mod questionnaire;
pub mod response;

// Re-export facades
pub use questionnaire::QuestionnaireResource;
pub use response::ResponseResource;

// Re-export public domain-level types
pub use extensions::{CodeableConcept, Coding, Extension};
pub use questionnaire::{ItemKind, ItemType, Questionnaire, QuestionnaireItem};
pub use response::{Answer, AnswerValue, QuestionnaireResponse, ResponseItem};

// Re-export LinkId from repop_types crate
pub use repop_types::LinkId;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Deserialize `T`, reporting the path of the first failing member on mismatch.
///
/// `what` names the resource in the error message (e.g. "Questionnaire").
pub(crate) fn deserialize_with_path<'de, D, T>(deserializer: D, what: &str) -> FhirResult<T>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    match serde_path_to_error::deserialize::<_, T>(deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() {
                "<root>"
            } else {
                path.as_str()
            };
            Err(FhirError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}

/// Check the `resourceType` discriminator of a parsed resource.
pub(crate) fn expect_resource_type(actual: &str, expected: &str) -> FhirResult<()> {
    if actual != expected {
        return Err(FhirError::InvalidInput(format!(
            "expected resourceType {expected}, found {actual}"
        )));
    }
    Ok(())
}
