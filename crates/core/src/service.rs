//! Repopulation service.
//!
//! Binds one questionnaire, its tab metadata and the resolved configuration, and runs a
//! diff-then-merge cycle against the host's form-state ports.

use crate::candidate::ItemsToRepopulate;
use crate::config::RepopulateConfig;
use crate::context::Tabs;
use crate::diff::compute_candidates;
use crate::merge::merge;
use crate::store::{FormStateReader, FormStateWriter};
use crate::visibility::EnableWhenState;
use crate::RepopResult;
use fhir::{Questionnaire, QuestionnaireResponse};
use std::sync::Arc;

/// Service for computing and applying repopulation change-sets.
#[derive(Clone)]
pub struct RepopulationService {
    cfg: Arc<RepopulateConfig>,
    questionnaire: Arc<Questionnaire>,
    tabs: Arc<Tabs>,
}

impl RepopulationService {
    pub fn new(
        cfg: Arc<RepopulateConfig>,
        questionnaire: Arc<Questionnaire>,
        tabs: Arc<Tabs>,
    ) -> Self {
        Self {
            cfg,
            questionnaire,
            tabs,
        }
    }

    /// Compute the change-set between `server` and the response currently in the store.
    ///
    /// The edited response and enableWhen results are read once, at call time. When enableWhen
    /// filtering is switched off every item is treated as visible.
    pub fn compute(
        &self,
        server: &QuestionnaireResponse,
        reader: &impl FormStateReader,
    ) -> ItemsToRepopulate {
        let current = reader.updatable_response();
        let enable_when = if self.cfg.enable_when_activated() {
            reader.enable_when_state()
        } else {
            Arc::new(EnableWhenState::default())
        };

        let candidates = compute_candidates(
            &self.questionnaire,
            server,
            &current,
            &self.tabs,
            &enable_when,
        );
        tracing::info!(
            candidates = candidates.len(),
            "repopulation candidates ready for review"
        );
        candidates
    }

    /// Merge `approved` into the response currently in the store and install the result.
    ///
    /// The merge runs against a fresh snapshot, so edits made while the change-set was under
    /// review are kept outside the approved linkIds. Returns the installed response.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RepopError::Store`] if the writer rejects the merged response; the
    /// store then still holds the previous response.
    pub fn apply(
        &self,
        approved: &ItemsToRepopulate,
        reader: &impl FormStateReader,
        writer: &impl FormStateWriter,
    ) -> RepopResult<QuestionnaireResponse> {
        let current = reader.updatable_response();
        let merged = merge(&self.questionnaire, &current, approved);

        writer.install_response(merged.clone())?;
        tracing::info!(approved = approved.len(), "repopulated response installed");
        Ok(merged)
    }
}
