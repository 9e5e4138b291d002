/// Errors returned by the repopulation core.
///
/// The diff and merge operations themselves never fail; only configuration parsing, resource
/// loading and the host's write port can.
#[derive(Debug, thiserror::Error)]
pub enum RepopError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to install merged response: {0}")]
    Store(String),

    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),
}

pub type RepopResult<T> = std::result::Result<T, RepopError>;
