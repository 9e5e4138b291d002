//! Ports to the host's form-state store.
//!
//! The engine never owns the live response. It reads snapshots through [`FormStateReader`] and
//! hands a complete new tree back through [`FormStateWriter`]; the host installs it as one value.
//! [`InMemoryFormStore`] is a ready-made implementation for hosts without a store of their own.

use crate::visibility::EnableWhenState;
use crate::RepopResult;
use arc_swap::ArcSwap;
use fhir::QuestionnaireResponse;
use std::sync::Arc;

/// Read side of the form-state store.
pub trait FormStateReader {
    /// Snapshot of the response currently being edited.
    fn updatable_response(&self) -> Arc<QuestionnaireResponse>;

    /// Snapshot of the latest enableWhen evaluation results.
    fn enable_when_state(&self) -> Arc<EnableWhenState>;
}

/// Write side of the form-state store.
pub trait FormStateWriter {
    /// Replace the edited response with `response` as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RepopError::Store`] if the host cannot accept the new tree.
    fn install_response(&self, response: QuestionnaireResponse) -> RepopResult<()>;
}

/// Form state held in memory behind atomic pointer swaps.
///
/// Readers always observe a complete tree: either the one before an install or the one after.
#[derive(Debug)]
pub struct InMemoryFormStore {
    response: ArcSwap<QuestionnaireResponse>,
    enable_when: ArcSwap<EnableWhenState>,
}

impl InMemoryFormStore {
    pub fn new(response: QuestionnaireResponse) -> Self {
        Self {
            response: ArcSwap::from_pointee(response),
            enable_when: ArcSwap::from_pointee(EnableWhenState::default()),
        }
    }

    /// Publish new enableWhen evaluation results.
    pub fn set_enable_when(&self, state: EnableWhenState) {
        self.enable_when.store(Arc::new(state));
    }
}

impl FormStateReader for InMemoryFormStore {
    fn updatable_response(&self) -> Arc<QuestionnaireResponse> {
        self.response.load_full()
    }

    fn enable_when_state(&self) -> Arc<EnableWhenState> {
        self.enable_when.load_full()
    }
}

impl FormStateWriter for InMemoryFormStore {
    fn install_response(&self, response: QuestionnaireResponse) -> RepopResult<()> {
        self.response.store(Arc::new(response));
        Ok(())
    }
}
