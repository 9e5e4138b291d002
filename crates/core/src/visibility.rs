//! Visibility filter over externally evaluated enableWhen results.
//!
//! The host evaluates `enableWhen` and `enableWhenExpression` and hands the engine a snapshot.
//! An item is hidden when either evaluation says it is disabled. Items missing from both maps
//! are visible: absence of a rule is not a reason to suppress data.

use fhir::LinkId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of enableWhen evaluation results, keyed by linkId.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableWhenState {
    /// Result of `enableWhen` per linkId (`true` = enabled).
    #[serde(default)]
    pub items: HashMap<LinkId, bool>,

    /// Result of `enableWhenExpression` per linkId (`true` = enabled).
    #[serde(default)]
    pub expressions: HashMap<LinkId, bool>,
}

impl EnableWhenState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an `enableWhen` result.
    pub fn with_item(mut self, link_id: LinkId, enabled: bool) -> Self {
        self.items.insert(link_id, enabled);
        self
    }

    /// Record an `enableWhenExpression` result.
    pub fn with_expression(mut self, link_id: LinkId, enabled: bool) -> Self {
        self.expressions.insert(link_id, enabled);
        self
    }

    pub fn is_hidden(&self, link_id: &str) -> bool {
        is_hidden(link_id, self)
    }
}

/// Whether `link_id` is currently suppressed from the form.
///
/// Hidden items contribute no repopulation candidates, and none of their descendants are
/// visited.
pub fn is_hidden(link_id: &str, state: &EnableWhenState) -> bool {
    state.items.get(link_id) == Some(&false) || state.expressions.get(link_id) == Some(&false)
}
